//! Search collaborator traits and their implementations.
//!
//! Two seams: [`BibliographicSearch`] for the research pipeline and
//! [`WebSearch`] for the web pipeline. Result streams are lazy; callers
//! decide how many candidates to consume.

pub mod bing;
pub mod google;
pub mod google_scholar;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod openalex;
pub mod searxng;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BibliographicProvider, Config, CoreError, WebProvider};
pub use http::HttpContext;

/// Boxed future returned by collaborator calls.
pub type SearchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchError>> + Send + 'a>>;

/// Lazy stream of bibliographic candidates.
pub type PublicationStream<'a> = BoxStream<'a, Result<Publication, SearchError>>;

/// A candidate publication reported by a bibliographic provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    pub authors: Vec<String>,
    /// Canonical publication link.
    pub url: Option<String>,
}

/// One organic result from a web search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub heading: String,
    pub url: String,
    /// Display citation printed under the heading (e.g. `"www.bbc.com › news"`),
    /// when the provider shows one.
    pub cite: Option<String>,
}

/// Parsed result page, hits in rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResultSet {
    pub hits: Vec<WebHit>,
}

impl WebResultSet {
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.heading.as_str())
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.url.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("rate limited (429)")]
    RateLimited { retry_after: Option<Duration> },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("request blocked by provider: {0}")]
    Blocked(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no result found for {0:?}")]
    NoResult(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::Http(e.to_string())
    }
}

/// A bibliographic index that can be searched by title.
pub trait BibliographicSearch: Send + Sync {
    /// Provider name used in logs, rate limiting and result `source`.
    fn name(&self) -> &str;

    /// Lazily stream publications matching `title`, restricted to
    /// `year_low..=year_high`.
    fn search_by_title_year<'a>(
        &'a self,
        title: &'a str,
        year_low: &'a str,
        year_high: &'a str,
    ) -> PublicationStream<'a>;

    /// The single nearest publication for `title`, with no year constraint.
    ///
    /// Fails with [`SearchError::NoResult`] when the index has nothing.
    fn search_single_best<'a>(&'a self, title: &'a str) -> SearchFuture<'a, Publication>;
}

/// A web search engine returning ranked result headings.
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    /// The engine's own domain. Hits on it are never external confirmations.
    fn domain(&self) -> &str;

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, WebResultSet>;
}

/// Build the configured bibliographic provider.
pub fn build_bibliographic(config: &Config, http: HttpContext) -> Arc<dyn BibliographicSearch> {
    match config.bibliographic {
        BibliographicProvider::GoogleScholar => {
            Arc::new(google_scholar::GoogleScholar::new(http))
        }
        BibliographicProvider::OpenAlex => Arc::new(openalex::OpenAlex::new(
            http,
            config.openalex_mailto.clone(),
        )),
    }
}

/// Build one web provider.
///
/// Fails if `Searxng` is requested without a base URL.
pub fn build_web(
    kind: WebProvider,
    config: &Config,
    http: HttpContext,
) -> Result<Arc<dyn WebSearch>, CoreError> {
    Ok(match kind {
        WebProvider::Google => Arc::new(google::Google::new(http)),
        WebProvider::Bing => Arc::new(bing::Bing::new(http)),
        WebProvider::Searxng => {
            let base_url = config.searxng_url.clone().ok_or_else(|| {
                CoreError::Config("searxng selected as a web provider but no searxng_url set".into())
            })?;
            Arc::new(searxng::Searxng::new(base_url, http))
        }
    })
}

struct PageState<F> {
    fetch: F,
    page: usize,
    pending: VecDeque<Publication>,
    exhausted: bool,
}

/// Turn a page fetcher into a lazy publication stream.
///
/// `fetch(n)` is called for page `n` (0-based) only once every candidate of
/// the previous page has been consumed. A short page, an error, or
/// `max_pages` ends the stream; an error is yielded once before it ends.
pub(crate) fn paged_stream<'a, F, Fut>(
    page_size: usize,
    max_pages: usize,
    fetch: F,
) -> PublicationStream<'a>
where
    F: FnMut(usize) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Vec<Publication>, SearchError>> + Send + 'a,
{
    let state = PageState {
        fetch,
        page: 0,
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(futures_util::stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(publication) = state.pending.pop_front() {
                return Some((Ok(publication), state));
            }
            if state.exhausted {
                return None;
            }

            match (state.fetch)(state.page).await {
                Ok(batch) => {
                    state.page += 1;
                    if batch.len() < page_size || state.page >= max_pages {
                        state.exhausted = true;
                    }
                    state.pending.extend(batch);
                }
                Err(e) => {
                    state.exhausted = true;
                    return Some((Err(e), state));
                }
            }
        }
    }))
}

/// Collapse runs of whitespace and trim.
pub(crate) fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
