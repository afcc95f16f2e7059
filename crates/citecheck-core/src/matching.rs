//! Match rules shared by the research and web pipelines.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{ResearchCitation, WebCitation};

/// Strip a trailing edition parenthetical from a book title.
///
/// Only titles containing an edition marker (`ed.`) are touched:
/// `"Introduction to machine learning (2nd ed.)"` → `"Introduction to machine learning"`.
/// A title with the marker but no parenthetical is returned unchanged.
pub fn strip_edition(title: &str) -> String {
    // Greedy: everything before the last " (".
    static BEFORE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+) \(").unwrap());

    if !title.contains("ed.") {
        return title.to_string();
    }
    BEFORE_PAREN
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| title.to_string())
}

/// Case-insensitive substring test. An empty needle never matches.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// First comma-delimited token of an author string (`"Bishop, C. M."` → `"Bishop"`).
pub fn first_author_token(author: &str) -> &str {
    author.split(',').next().unwrap_or("").trim()
}

/// Does a bibliographic candidate satisfy the research match rule?
///
/// Both must hold:
/// - the normalised reference title is a case-insensitive substring of the
///   candidate title;
/// - the first comma token of the reference author appears (case-sensitive)
///   in the candidate title or in one of its listed authors.
///
/// The author test is a plain substring check and accepts common surnames
/// that belong to someone else.
pub fn research_candidate_matches(
    title: &str,
    author: &str,
    candidate_title: &str,
    candidate_authors: &[String],
) -> bool {
    if !contains_ci(candidate_title, title) {
        return false;
    }
    let surname = first_author_token(author);
    candidate_title.contains(surname) || candidate_authors.iter().any(|a| a.contains(surname))
}

/// Build the web search query: title, author, publisher and year.
pub fn web_query(citation: &WebCitation) -> String {
    [
        Some(citation.title.as_str()),
        citation.author.as_deref(),
        Some(citation.publisher.as_str()),
        Some(citation.year.as_str()),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Title used for bibliographic queries.
pub fn research_query_title(citation: &ResearchCitation) -> String {
    strip_edition(citation.title.trim())
}

/// Lowercased host of an absolute http(s) URL, without a leading `www.`.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().map(|h| h.trim_start_matches("www.").to_string())
}

/// Host named by a display citation printed under a result
/// (`"www.bing.com › videos"`, `"https://www.bbc.com › news"`).
pub fn cite_host(cite: &str) -> Option<String> {
    let head = cite
        .split(|c: char| c.is_whitespace() || c == '›')
        .find(|s| !s.is_empty())?;
    let host = if head.contains("://") {
        host_of(head)
    } else {
        host_of(&format!("https://{head}"))
    }?;
    host.contains('.').then_some(host)
}

/// Whether `url` points at `domain` or one of its subdomains.
pub fn is_on_domain(url: &str, domain: &str) -> bool {
    host_of(url).is_some_and(|host| host_matches(&host, domain))
}

/// Whether a display citation names `domain` or one of its subdomains.
pub fn cite_on_domain(cite: &str, domain: &str) -> bool {
    cite_host(cite).is_some_and(|host| host_matches(&host, domain))
}

fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches("www.").to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
