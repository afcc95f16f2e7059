use thiserror::Error;

pub mod citation;
pub mod section;

pub use citation::{parse_citation, parse_citations};
pub use section::extract_reference_lines;
// Re-export domain types from core (canonical definitions live there)
pub use citecheck_core::{Citation, ParsedCitations, ResearchCitation, WebCitation};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no \"References:\" marker found in document")]
    MissingMarker,
    #[error("unrecognised citation format: {0:?}")]
    UnparseableFormat(String),
}

/// Extract and classify every citation in a document.
///
/// Pipeline:
/// 1. Split the text into lines
/// 2. Locate the references marker and keep the non-blank lines after it
/// 3. Classify each line as a web or research citation
///
/// Any line that fits no known surface form aborts the parse.
pub fn parse_document(text: &str) -> Result<ParsedCitations, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let raw = extract_reference_lines(&lines)?;
    parse_citations(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_without_marker_is_rejected() {
        let text = "Here is an answer.\nSmith, J. \"AI Basics.\" TechReview, 2021.\n";
        assert_eq!(parse_document(text), Err(ParseError::MissingMarker));
    }

    #[test]
    fn document_splits_by_category() {
        let text = "Some prose.\n\nReferences:\n\
                    1. Smith, J. \"AI Basics.\" TechReview, 2021.\n\
                    \n\
                    2. Bishop, C. M. (2006). Pattern recognition and machine learning. New York: Springer.\n";
        let parsed = parse_document(text).unwrap();
        assert_eq!(parsed.web.len(), 1);
        assert_eq!(parsed.research.len(), 1);
    }
}
