//! Bing web search, scraped from the HTML result page.
//!
//! Used as the secondary web provider. Bing mixes its own video and image
//! carousels into the organic list, often as relative links; every link is
//! resolved against the Bing origin so the caller can filter them using
//! [`DOMAIN`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::matching::is_on_domain;

use super::{HttpContext, SearchError, SearchFuture, WebHit, WebResultSet, WebSearch, clean_text};

pub const NAME: &str = "Bing";
pub const DOMAIN: &str = "bing.com";

const BASE_URL: &str = "https://www.bing.com/search";

pub struct Bing {
    http: HttpContext,
}

impl Bing {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    fn search_url(query: &str) -> String {
        format!("{}?setlang=en&q={}", BASE_URL, urlencoding::encode(query))
    }
}

impl WebSearch for Bing {
    fn name(&self) -> &str {
        NAME
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, WebResultSet> {
        Box::pin(async move {
            let html = self.http.get_text(NAME, &Self::search_url(query)).await?;
            parse_results(&html)
        })
    }
}

static RESULT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("li.b_algo").unwrap());
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a").unwrap());
static CITE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("cite").unwrap());

/// Parse a Bing result page into hits, in rank order.
pub(crate) fn parse_results(html: &str) -> Result<WebResultSet, SearchError> {
    let document = Html::parse_document(html);

    let hits: Vec<WebHit> = document
        .select(&RESULT_SEL)
        .filter_map(|entry| {
            let link = entry.select(&LINK_SEL).next()?;
            let url = resolve_href(link.value().attr("href")?)?;
            let heading = clean_text(&link.text().collect::<String>());
            if heading.is_empty() {
                return None;
            }
            let cite = entry
                .select(&CITE_SEL)
                .next()
                .map(|c| clean_text(&c.text().collect::<String>()))
                .filter(|c| !c.is_empty());
            Some(WebHit { heading, url, cite })
        })
        .collect();

    if hits.is_empty() {
        return Err(SearchError::NoResult("Bing returned no organic results".into()));
    }
    Ok(WebResultSet { hits })
}

static BING_ORIGIN: Lazy<Url> = Lazy::new(|| Url::parse("https://www.bing.com/").unwrap());

/// Absolute destination of a result link.
///
/// Relative links resolve onto the Bing origin. Click-tracking wrappers
/// (`/ck/a?...&u=a1<base64url target>`) are unwrapped to their target; a
/// wrapper that cannot be decoded stays a Bing link.
fn resolve_href(href: &str) -> Option<String> {
    let link = BING_ORIGIN.join(href.trim()).ok()?;
    let link = if is_on_domain(link.as_str(), DOMAIN) && link.path() == "/ck/a" {
        let target = link
            .query_pairs()
            .find(|(k, _)| k == "u")
            .and_then(|(_, v)| decode_tracking_target(&v));
        target.unwrap_or(link)
    } else {
        link
    };
    matches!(link.scheme(), "http" | "https").then(|| link.into())
}

fn decode_tracking_target(value: &str) -> Option<Url> {
    let encoded = value.strip_prefix("a1").unwrap_or(value).trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let target = Url::parse(std::str::from_utf8(&bytes).ok()?).ok()?;
    matches!(target.scheme(), "http" | "https").then_some(target)
}
