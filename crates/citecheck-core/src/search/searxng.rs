//! SearxNG metasearch, queried through its JSON API.
//!
//! A self-hosted instance can stand in for either web provider. It is not
//! rate limited.

use serde::Deserialize;

use super::{HttpContext, SearchError, SearchFuture, WebHit, WebResultSet, WebSearch};
use crate::matching::host_of;

pub const NAME: &str = "SearxNG";

/// SearxNG web search backend.
pub struct Searxng {
    /// Base URL of the SearxNG instance (e.g., "http://localhost:8080")
    base_url: String,
    domain: String,
    http: HttpContext,
}

impl Searxng {
    pub fn new(base_url: String, http: HttpContext) -> Self {
        let domain = host_of(&base_url).unwrap_or_else(|| base_url.clone());
        Self {
            base_url,
            domain,
            http,
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }
}

/// Response from SearxNG JSON API.
#[derive(Debug, Deserialize)]
struct SearxngResponse {
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    title: String,
    url: String,
    #[serde(default)]
    pretty_url: Option<String>,
}

impl WebSearch for Searxng {
    fn name(&self) -> &str {
        NAME
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, WebResultSet> {
        Box::pin(async move {
            let body = self.http.get_text(NAME, &self.search_url(query)).await?;
            parse_response(&body)
        })
    }
}

fn parse_response(body: &str) -> Result<WebResultSet, SearchError> {
    let data: SearxngResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

    let hits: Vec<WebHit> = data
        .results
        .into_iter()
        .filter(|r| !r.title.trim().is_empty())
        .map(|r| WebHit {
            heading: r.title.trim().to_string(),
            url: r.url,
            cite: r.pretty_url,
        })
        .collect();

    if hits.is_empty() {
        return Err(SearchError::NoResult("SearxNG returned no results".into()));
    }
    Ok(WebResultSet { hits })
}
