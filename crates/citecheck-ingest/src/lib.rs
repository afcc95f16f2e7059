use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use citecheck_core::{Checker, CoreError, ParsedCitations, VerificationResult};
use citecheck_parsing::ParseError;

// Re-export domain types for convenience
pub use citecheck_core::{Category, Citation};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("citation parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("verification run cancelled")]
    Cancelled,
    #[error("verification error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for IngestError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Cancelled => IngestError::Cancelled,
            other => IngestError::Core(other),
        }
    }
}

/// Results of one verification run, one entry per parsed citation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub web: Vec<VerificationResult>,
    pub research: Vec<VerificationResult>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.web.len() + self.research.len()
    }

    pub fn is_empty(&self) -> bool {
        self.web.is_empty() && self.research.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.web
            .iter()
            .chain(self.research.iter())
            .filter(|r| r.verified)
            .count()
    }
}

/// Read a response document as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a response file without verifying anything.
pub fn parse_file(path: &Path) -> Result<ParsedCitations, IngestError> {
    let text = read_document(path)?;
    Ok(citecheck_parsing::parse_document(&text)?)
}

/// Parse `document_text` and verify every citation in it.
///
/// Structural problems (no references marker, an unrecognised line) fail
/// before any search is issued. The two pipelines run side by side; a
/// cancelled token aborts both and no partial report is returned.
pub async fn run_core(
    document_text: &str,
    checker: &Checker,
    cancel: &CancellationToken,
) -> Result<Report, IngestError> {
    let parsed = citecheck_parsing::parse_document(document_text)?;
    verify_parsed(&parsed, checker, cancel).await
}

/// Verify already-parsed citations.
pub async fn verify_parsed(
    parsed: &ParsedCitations,
    checker: &Checker,
    cancel: &CancellationToken,
) -> Result<Report, IngestError> {
    tracing::info!(
        web = parsed.web.len(),
        research = parsed.research.len(),
        "starting verification"
    );

    let (web, research) = tokio::try_join!(
        checker.verify_web(&parsed.web, cancel),
        checker.verify_research(&parsed.research, cancel),
    )?;

    let report = Report { web, research };
    tracing::info!(
        total = report.len(),
        verified = report.verified_count(),
        "verification finished"
    );
    Ok(report)
}

/// Read `path` and run [`run_core`] over it.
pub async fn check_file(
    path: &Path,
    checker: &Checker,
    cancel: &CancellationToken,
) -> Result<Report, IngestError> {
    let text = read_document(path)?;
    run_core(&text, checker, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_core_error_maps_to_cancelled() {
        assert!(matches!(
            IngestError::from(CoreError::Cancelled),
            IngestError::Cancelled
        ));
        assert!(matches!(
            IngestError::from(CoreError::Config("x".into())),
            IngestError::Core(_)
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_document(Path::new("/nonexistent/response.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/response.txt"));
    }

    #[test]
    fn report_counts() {
        let report = Report {
            web: vec![VerificationResult::placeholder("a", Category::Web)],
            research: vec![VerificationResult::verified(
                "b",
                Category::Research,
                None,
                "Scholar",
            )],
        };
        assert_eq!(report.len(), 2);
        assert_eq!(report.verified_count(), 1);
    }
}
