//! Classification of a single citation line into a typed record.
//!
//! Three surface forms are recognised, tried in order:
//!
//! 1. `AUTHOR. "TITLE." PUBLISHER, YEAR.` (web)
//! 2. `"TITLE." PUBLISHER, YEAR.` (web, no author)
//! 3. `AUTHOR. (YEAR). TITLE. LOCATION: PUBLISHER.` (research)
//!
//! Rule 1 must precede rule 2, otherwise the author would leak into the
//! title of an authored web citation.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use citecheck_core::{Citation, ParsedCitations, ResearchCitation, WebCitation};

use crate::ParseError;

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures<'_>, &str) -> Citation,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            name: "authored-web",
            pattern: Regex::new(r#"^(.+?)\.?\s+"(.+?)[.,]?"\s+(.+),\s+(\d{4})\b"#).unwrap(),
            build: |c, raw| {
                Citation::Web(WebCitation {
                    raw_citation: raw.to_string(),
                    title: group(c, 2),
                    publisher: group(c, 3),
                    author: Some(group(c, 1)),
                    year: group(c, 4),
                })
            },
        },
        Rule {
            name: "web",
            pattern: Regex::new(r#"^"(.+?)[.,]?"\s+(.+),\s+(\d{4})\b"#).unwrap(),
            build: |c, raw| {
                Citation::Web(WebCitation {
                    raw_citation: raw.to_string(),
                    title: group(c, 1),
                    publisher: group(c, 2),
                    author: None,
                    year: group(c, 3),
                })
            },
        },
        Rule {
            name: "research",
            pattern: Regex::new(r"^(.+?)\s+\((\d{4})\)\.\s+(.+)\.\s+([^:]+?):\s+(.+?)\.?\s*$")
                .unwrap(),
            // Title is greedy so it ends at the last ". " before the location;
            // the location may itself contain periods ("Washington, D.C.").
            // Group 4 (location) is dropped.
            build: |c, raw| {
                Citation::Research(ResearchCitation {
                    raw_citation: raw.to_string(),
                    title: group(c, 3),
                    publisher: group(c, 5),
                    author: group(c, 1),
                    year: group(c, 2),
                })
            },
        },
    ]
});

fn group(c: &Captures<'_>, i: usize) -> String {
    c.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

/// Fold typographic double quotes and drop any enumeration prefix.
///
/// Everything before the first alphabetic character or `"` is removed, so
/// `"3. "`, `"[12] "` and `"- "` all disappear.
fn normalize_line(line: &str) -> String {
    let folded = line.replace(['\u{201C}', '\u{201D}'], "\"");
    match folded.find(|c: char| c.is_alphabetic() || c == '"') {
        Some(start) => folded[start..].trim_end().to_string(),
        None => String::new(),
    }
}

/// Classify one raw citation line.
pub fn parse_citation(line: &str) -> Result<Citation, ParseError> {
    let raw = line.trim();
    let text = normalize_line(raw);
    if text.is_empty() {
        return Err(ParseError::UnparseableFormat(raw.to_string()));
    }

    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(&text) {
            let citation = (rule.build)(&caps, raw);
            tracing::debug!(
                rule = rule.name,
                category = %citation.category(),
                title = citation.title(),
                "citation classified"
            );
            return Ok(citation);
        }
    }
    Err(ParseError::UnparseableFormat(raw.to_string()))
}

/// Classify every line, keeping document order within each category.
///
/// Stops at the first line that fits no surface form.
pub fn parse_citations<S: AsRef<str>>(lines: &[S]) -> Result<ParsedCitations, ParseError> {
    let mut parsed = ParsedCitations::default();
    for line in lines {
        parsed.push(parse_citation(line.as_ref())?);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(line: &str) -> WebCitation {
        match parse_citation(line).unwrap() {
            Citation::Web(c) => c,
            other => panic!("expected web citation, got {:?}", other),
        }
    }

    fn research(line: &str) -> ResearchCitation {
        match parse_citation(line).unwrap() {
            Citation::Research(c) => c,
            other => panic!("expected research citation, got {:?}", other),
        }
    }

    #[test]
    fn authored_web_takes_precedence() {
        let c = web(r#"Smith, J. "AI Basics." TechReview, 2021."#);
        assert_eq!(c.author.as_deref(), Some("Smith, J"));
        assert_eq!(c.title, "AI Basics");
        assert_eq!(c.publisher, "TechReview");
        assert_eq!(c.year, "2021");
    }

    #[test]
    fn quote_only_web_has_no_author() {
        let c = web(r#""WeChat: The Complete Guide." TechNode, 2020."#);
        assert_eq!(c.author, None);
        assert_eq!(c.title, "WeChat: The Complete Guide");
        assert_eq!(c.publisher, "TechNode");
        assert_eq!(c.year, "2020");
    }

    #[test]
    fn research_form_drops_location() {
        let c = research(
            "Bishop, C. M. (2006). Pattern recognition and machine learning. New York: Springer.",
        );
        assert_eq!(c.author, "Bishop, C. M.");
        assert_eq!(c.year, "2006");
        assert_eq!(c.title, "Pattern recognition and machine learning");
        assert_eq!(c.publisher, "Springer");
    }

    #[test]
    fn research_location_may_contain_periods() {
        let c = research(
            "American Psychological Association. (2010). Publication manual of the American Psychological Association. Washington, D.C.: American Psychological Association.",
        );
        assert_eq!(c.author, "American Psychological Association.");
        assert_eq!(
            c.title,
            "Publication manual of the American Psychological Association"
        );
        assert_eq!(c.publisher, "American Psychological Association");

        let c = research(
            "Russell, S., & Norvig, P. (2010). Artificial intelligence: A modern approach (3rd ed.). Upper Saddle River, N.J.: Prentice Hall.",
        );
        assert_eq!(c.title, "Artificial intelligence: A modern approach (3rd ed.)");
        assert_eq!(c.publisher, "Prentice Hall");
        assert_eq!(c.year, "2010");
    }

    #[test]
    fn research_title_may_contain_colon() {
        let c = research(
            "Murphy, K. P. (2012). Machine learning: A probabilistic perspective. Cambridge, MA: MIT Press.",
        );
        assert_eq!(c.title, "Machine learning: A probabilistic perspective");
        assert_eq!(c.publisher, "MIT Press");
    }

    #[test]
    fn enumeration_and_typographic_quotes_are_normalised() {
        let c = web("12) \u{201C}The Rise of WeChat.\u{201D} BBC News, 2019.");
        assert_eq!(c.title, "The Rise of WeChat");
        assert_eq!(c.publisher, "BBC News");
        assert_eq!(c.raw_citation, "12) \u{201C}The Rise of WeChat.\u{201D} BBC News, 2019.");
    }

    #[test]
    fn bare_url_is_unparseable() {
        assert_eq!(
            parse_citation("4. https://example.com/article"),
            Err(ParseError::UnparseableFormat(
                "4. https://example.com/article".into()
            ))
        );
    }

    #[test]
    fn line_without_letters_is_unparseable() {
        assert!(matches!(
            parse_citation("12. 2020."),
            Err(ParseError::UnparseableFormat(_))
        ));
    }

    #[test]
    fn first_bad_line_aborts_the_batch() {
        let lines = [
            r#""A." B, 2020."#,
            "not a citation at all",
            r#""C." D, 2021."#,
        ];
        assert_eq!(
            parse_citations(&lines),
            Err(ParseError::UnparseableFormat("not a citation at all".into()))
        );
    }

    #[test]
    fn reparsing_raw_text_is_stable() {
        let lines = [
            "1. Smith, J. \"AI Basics.\" TechReview, 2021.",
            "2. Bishop, C. M. (2006). Pattern recognition and machine learning. New York: Springer.",
        ];
        let first = parse_citations(&lines).unwrap();
        let again: Vec<String> = first
            .web
            .iter()
            .map(|c| c.raw_citation.clone())
            .chain(first.research.iter().map(|c| c.raw_citation.clone()))
            .collect();
        assert_eq!(parse_citations(&again).unwrap(), first);
    }
}
