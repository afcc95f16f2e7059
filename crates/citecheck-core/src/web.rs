//! Web pipeline: confirm web article citations through search engines.

use std::time::Duration;

use crate::matching::{cite_on_domain, contains_ci, is_on_domain, web_query};
use crate::search::{SearchError, WebHit, WebSearch};
use crate::{Category, VerificationResult, WebCitation};

/// How a provider's hits are screened for self-references.
#[derive(Debug, Clone, Copy)]
enum SelfFilter {
    /// Drop hits whose URL is on the provider's domain.
    Url,
    /// Drop hits whose display citation or URL is on the provider's domain.
    CiteOrUrl,
}

/// Verify one web citation.
///
/// The primary provider is tried first; any failure sends the identical
/// query to the secondary. Never fails: when both providers fail the result
/// is a placeholder with no URL.
pub async fn verify_web_one(
    citation: &WebCitation,
    primary: &dyn WebSearch,
    secondary: &dyn WebSearch,
    scan_limit: usize,
    timeout: Duration,
) -> VerificationResult {
    let query = web_query(citation);

    match search_hits(primary, &query, SelfFilter::Url, timeout).await {
        Ok(hits) => return judge(citation, &hits, scan_limit, primary.name()),
        Err(e) => {
            tracing::warn!(
                title = %citation.title,
                provider = primary.name(),
                error = %e,
                "primary web search failed, trying secondary"
            );
        }
    }

    match search_hits(secondary, &query, SelfFilter::CiteOrUrl, timeout).await {
        Ok(hits) => judge(citation, &hits, scan_limit, secondary.name()),
        Err(e) => {
            tracing::warn!(
                title = %citation.title,
                provider = secondary.name(),
                error = %e,
                "secondary web search failed"
            );
            VerificationResult::placeholder(&citation.title, Category::Web)
        }
    }
}

/// Run one provider and return its usable hits. No usable hits is a failure.
async fn search_hits(
    provider: &dyn WebSearch,
    query: &str,
    filter: SelfFilter,
    timeout: Duration,
) -> Result<Vec<WebHit>, SearchError> {
    let set = tokio::time::timeout(timeout, provider.search(query))
        .await
        .map_err(|_| SearchError::Timeout(timeout))??;

    let domain = provider.domain();
    let hits: Vec<WebHit> = set
        .hits
        .into_iter()
        .filter(|hit| match filter {
            SelfFilter::Url => !is_on_domain(&hit.url, domain),
            SelfFilter::CiteOrUrl => {
                let cited_self = hit.cite.as_deref().is_some_and(|c| cite_on_domain(c, domain));
                !cited_self && !is_on_domain(&hit.url, domain)
            }
        })
        .collect();

    if hits.is_empty() {
        return Err(SearchError::NoResult(format!(
            "{} returned no usable hits",
            provider.name()
        )));
    }
    Ok(hits)
}

/// Scan up to `scan_limit` headings for the citation title.
fn judge(
    citation: &WebCitation,
    hits: &[WebHit],
    scan_limit: usize,
    source: &str,
) -> VerificationResult {
    if let Some(hit) = hits
        .iter()
        .take(scan_limit)
        .find(|hit| contains_ci(&hit.heading, &citation.title))
    {
        tracing::debug!(title = %citation.title, source, url = %hit.url, "web citation confirmed");
        return VerificationResult::verified(
            &citation.title,
            Category::Web,
            Some(hit.url.clone()),
            source,
        );
    }

    tracing::debug!(title = %citation.title, source, scan_limit, "no heading matched");
    VerificationResult::unconfirmed(
        &citation.title,
        Category::Web,
        hits.first().map(|h| h.url.clone()),
        source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::WebResultSet;
    use crate::search::mock::MockWeb;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn citation() -> WebCitation {
        WebCitation {
            raw_citation: String::new(),
            title: "The rise of WeChat".into(),
            publisher: "BBC".into(),
            author: None,
            year: "2020".into(),
        }
    }

    fn hit(heading: &str, url: &str, cite: Option<&str>) -> WebHit {
        WebHit {
            heading: heading.into(),
            url: url.into(),
            cite: cite.map(String::from),
        }
    }

    fn set(hits: Vec<WebHit>) -> Result<WebResultSet, SearchError> {
        Ok(WebResultSet { hits })
    }

    #[tokio::test]
    async fn primary_match_is_verified() {
        let primary = MockWeb::new(
            "Google",
            "google.com",
            set(vec![
                hit("Unrelated", "https://a.example/", None),
                hit("THE RISE OF WECHAT - BBC News", "https://www.bbc.com/1", None),
            ]),
        );
        let secondary = MockWeb::new("Bing", "bing.com", Err(SearchError::Status(500)));
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert!(r.verified);
        assert_eq!(r.url.as_deref(), Some("https://www.bbc.com/1"));
        assert_eq!(r.source.as_deref(), Some("Google"));
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn primary_exhaustion_reports_first_url() {
        let mut hits = vec![hit("Maps", "https://maps.google.com/x", None)];
        hits.extend((0..6).map(|i| hit(&format!("Other {i}"), &format!("https://o{i}.example/"), None)));
        hits.push(hit("The rise of WeChat", "https://late.example/", None));
        let primary = MockWeb::new("Google", "google.com", set(hits));
        let secondary = MockWeb::new("Bing", "bing.com", Err(SearchError::Status(500)));
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert!(!r.verified);
        assert_eq!(r.url.as_deref(), Some("https://o0.example/"));
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn failover_skips_secondary_self_references() {
        let primary = MockWeb::new("Google", "google.com", Err(SearchError::Status(429)));
        let secondary = MockWeb::new(
            "Bing",
            "bing.com",
            set(vec![
                hit(
                    "The rise of WeChat - video",
                    "https://example.net/v",
                    Some("www.bing.com › videos"),
                ),
                hit("The Rise of WeChat | BBC", "https://www.bbc.com/1", None),
            ]),
        );
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert!(r.verified);
        assert_eq!(r.url.as_deref(), Some("https://www.bbc.com/1"));
        assert_eq!(r.source.as_deref(), Some("Bing"));
        assert_eq!(primary.queries(), secondary.queries());
    }

    #[tokio::test]
    async fn secondary_relative_self_links_are_skipped() {
        let page = r#"<html><body><ol id="b_results">
            <li class="b_algo">
              <h2><a href="/videos/search?q=the+rise+of+wechat">The rise of WeChat - Bing video</a></h2>
            </li>
            <li class="b_algo">
              <h2><a href="https://www.bbc.com/news/technology-47164010">The Rise of WeChat - BBC News</a></h2>
              <div class="b_caption"><cite>https://www.bbc.com › news</cite></div>
            </li>
        </ol></body></html>"#;
        let primary = MockWeb::new("Google", "google.com", Err(SearchError::Status(503)));
        let secondary = MockWeb::new(
            crate::search::bing::NAME,
            crate::search::bing::DOMAIN,
            crate::search::bing::parse_results(page),
        );
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert!(r.verified);
        assert_eq!(
            r.url.as_deref(),
            Some("https://www.bbc.com/news/technology-47164010")
        );
    }

    #[tokio::test]
    async fn primary_with_only_self_hits_fails_over() {
        let primary = MockWeb::new(
            "Google",
            "google.com",
            set(vec![hit("The rise of WeChat", "https://news.google.com/a", None)]),
        );
        let secondary = MockWeb::new(
            "Bing",
            "bing.com",
            set(vec![hit("Something else", "https://x.example/", None)]),
        );
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert!(!r.verified);
        assert_eq!(r.url.as_deref(), Some("https://x.example/"));
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn both_failing_yields_placeholder() {
        let primary = MockWeb::new("Google", "google.com", Err(SearchError::Http("dns".into())));
        let secondary = MockWeb::new("Bing", "bing.com", set(vec![]));
        let r = verify_web_one(&citation(), &primary, &secondary, 5, TIMEOUT).await;
        assert_eq!(r, VerificationResult::placeholder("The rise of WeChat", Category::Web));
    }

    #[tokio::test(start_paused = true)]
    async fn primary_timeout_fails_over() {
        let primary = MockWeb::new(
            "Google",
            "google.com",
            set(vec![hit("The rise of WeChat", "https://slow.example/", None)]),
        )
        .with_delay(Duration::from_secs(60));
        let secondary = MockWeb::new(
            "Bing",
            "bing.com",
            set(vec![hit("The rise of WeChat", "https://fast.example/", None)]),
        );
        let r = verify_web_one(&citation(), &primary, &secondary, 5, Duration::from_secs(2)).await;
        assert!(r.verified);
        assert_eq!(r.url.as_deref(), Some("https://fast.example/"));
    }
}
