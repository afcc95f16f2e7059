use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod checker;
pub mod config_file;
pub mod matching;
pub mod rate_limit;
pub mod research;
pub mod search;
pub mod web;


// Re-export for convenience
pub use checker::Checker;
pub use rate_limit::{AdaptiveLimiter, RateLimiters};
pub use search::{BibliographicSearch, Publication, SearchError, WebHit, WebResultSet, WebSearch};

/// Which verification pipeline a citation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Web,
    Research,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Web => write!(f, "web"),
            Category::Research => write!(f, "research"),
        }
    }
}

/// A web article citation, e.g. `"Title." Publisher, 2020.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebCitation {
    pub raw_citation: String,
    pub title: String,
    /// Site or outlet name.
    pub publisher: String,
    pub author: Option<String>,
    pub year: String,
}

/// An academic citation, e.g. `Author. (2006). Title. City: Publisher.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchCitation {
    pub raw_citation: String,
    pub title: String,
    pub publisher: String,
    pub author: String,
    pub year: String,
}

/// A parsed citation line, tagged by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Citation {
    Web(WebCitation),
    Research(ResearchCitation),
}

impl Citation {
    pub fn category(&self) -> Category {
        match self {
            Citation::Web(_) => Category::Web,
            Citation::Research(_) => Category::Research,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Citation::Web(c) => &c.title,
            Citation::Research(c) => &c.title,
        }
    }
}

/// Output of the parser: both categories, each in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCitations {
    pub web: Vec<WebCitation>,
    pub research: Vec<ResearchCitation>,
}

impl ParsedCitations {
    pub fn push(&mut self, citation: Citation) {
        match citation {
            Citation::Web(c) => self.web.push(c),
            Citation::Research(c) => self.research.push(c),
        }
    }

    pub fn len(&self) -> usize {
        self.web.len() + self.research.len()
    }

    pub fn is_empty(&self) -> bool {
        self.web.is_empty() && self.research.is_empty()
    }
}

/// The outcome of checking one citation against its search collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub title: String,
    pub category: Category,
    /// `true` only when a candidate passed the match rules.
    pub verified: bool,
    /// Canonical link when verified, nearest-match suggestion otherwise.
    /// `None` when every provider failed.
    pub url: Option<String>,
    /// Provider that supplied `url`.
    pub source: Option<String>,
}

impl VerificationResult {
    pub fn verified(title: &str, category: Category, url: Option<String>, source: &str) -> Self {
        Self {
            title: title.to_string(),
            category,
            verified: true,
            url,
            source: Some(source.to_string()),
        }
    }

    pub fn unconfirmed(
        title: &str,
        category: Category,
        url: Option<String>,
        source: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            category,
            verified: false,
            url,
            source: Some(source.to_string()),
        }
    }

    /// Degraded result used when no provider produced anything.
    pub fn placeholder(title: &str, category: Category) -> Self {
        Self {
            title: title.to_string(),
            category,
            verified: false,
            url: None,
            source: None,
        }
    }
}

/// Progress updates emitted while a pipeline runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        category: Category,
        index: usize,
        total: usize,
        title: String,
    },
    Result {
        index: usize,
        total: usize,
        result: Box<VerificationResult>,
    },
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("verification run cancelled")]
    Cancelled,
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Browser identity sent with every scraping request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeIdentity {
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for ScrapeIdentity {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Bibliographic collaborator used by the research pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BibliographicProvider {
    #[default]
    GoogleScholar,
    #[serde(rename = "openalex")]
    OpenAlex,
}

impl FromStr for BibliographicProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "google_scholar" | "scholar" => Ok(Self::GoogleScholar),
            "openalex" => Ok(Self::OpenAlex),
            other => Err(format!("unknown bibliographic provider: {other}")),
        }
    }
}

/// Web search collaborator used by the web pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebProvider {
    Google,
    Bing,
    Searxng,
}

impl FromStr for WebProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "bing" => Ok(Self::Bing),
            "searxng" => Ok(Self::Searxng),
            other => Err(format!("unknown web provider: {other}")),
        }
    }
}

/// Default number of candidates consumed before falling back.
pub const DEFAULT_SCAN_LIMIT: usize = 5;

/// Configuration for a verification run.
#[derive(Clone)]
pub struct Config {
    pub scan_limit: usize,
    /// Records verified concurrently within one pipeline. 1 keeps strict
    /// document order of requests.
    pub num_workers: usize,
    pub timeout_secs: u64,
    pub identity: ScrapeIdentity,
    pub bibliographic: BibliographicProvider,
    pub primary_web: WebProvider,
    pub secondary_web: WebProvider,
    /// SearxNG base URL (e.g., "http://localhost:8080"), required when either
    /// web provider is `Searxng`.
    pub searxng_url: Option<String>,
    /// Contact address sent to OpenAlex for its polite pool.
    pub openalex_mailto: Option<String>,
    pub rate_limiters: Arc<RateLimiters>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("scan_limit", &self.scan_limit)
            .field("num_workers", &self.num_workers)
            .field("timeout_secs", &self.timeout_secs)
            .field("identity", &self.identity)
            .field("bibliographic", &self.bibliographic)
            .field("primary_web", &self.primary_web)
            .field("secondary_web", &self.secondary_web)
            .field("searxng_url", &self.searxng_url)
            .field(
                "openalex_mailto",
                &self.openalex_mailto.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_limit: DEFAULT_SCAN_LIMIT,
            num_workers: 1,
            timeout_secs: 10,
            identity: ScrapeIdentity::default(),
            bibliographic: BibliographicProvider::GoogleScholar,
            primary_web: WebProvider::Google,
            secondary_web: WebProvider::Bing,
            searxng_url: None,
            openalex_mailto: None,
            rate_limiters: Arc::new(RateLimiters::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse() {
        assert_eq!(
            "google-scholar".parse::<BibliographicProvider>(),
            Ok(BibliographicProvider::GoogleScholar)
        );
        assert_eq!(
            "OpenAlex".parse::<BibliographicProvider>(),
            Ok(BibliographicProvider::OpenAlex)
        );
        assert_eq!("Bing".parse::<WebProvider>(), Ok(WebProvider::Bing));
        assert!("altavista".parse::<WebProvider>().is_err());
    }

    #[test]
    fn parsed_citations_route_by_category() {
        let mut parsed = ParsedCitations::default();
        parsed.push(Citation::Web(WebCitation {
            raw_citation: "\"T.\" P, 2020.".into(),
            title: "T".into(),
            publisher: "P".into(),
            author: None,
            year: "2020".into(),
        }));
        parsed.push(Citation::Research(ResearchCitation {
            raw_citation: "A. (2006). T. L: P.".into(),
            title: "T".into(),
            publisher: "P".into(),
            author: "A.".into(),
            year: "2006".into(),
        }));
        assert_eq!(parsed.web.len(), 1);
        assert_eq!(parsed.research.len(), 1);
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn debug_masks_mailto() {
        let config = Config {
            openalex_mailto: Some("me@example.org".into()),
            ..Config::default()
        };
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("me@example.org"));
        assert!(dbg.contains("***"));
    }
}
