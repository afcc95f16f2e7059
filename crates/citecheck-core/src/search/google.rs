//! Google web search, scraped from the HTML result page.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{HttpContext, SearchError, SearchFuture, WebHit, WebResultSet, WebSearch, clean_text};
use crate::matching::is_on_domain;

pub const NAME: &str = "Google";
pub const DOMAIN: &str = "google.com";

const BASE_URL: &str = "https://www.google.com/search";

pub struct Google {
    http: HttpContext,
}

impl Google {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    fn search_url(query: &str) -> String {
        format!("{}?hl=en&q={}", BASE_URL, urlencoding::encode(query))
    }
}

impl WebSearch for Google {
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

static HEADING_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a h3").unwrap());
static CITE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("cite").unwrap());
static CAPTCHA_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#captcha-form, form#captcha, #recaptcha").unwrap());

/// Parse a Google result page into hits, in rank order.
///
/// A page with no organic results is an error so the caller can fall back.
pub(crate) fn parse_results(html: &str) -> Result<WebResultSet, SearchError> {
    let document = Html::parse_document(html);

    if document.select(&CAPTCHA_SEL).next().is_some() {
        return Err(SearchError::Blocked("Google captcha".into()));
    }

    let mut hits = Vec::new();
    for heading in document.select(&HEADING_SEL) {
        let Some(anchor) = enclosing_anchor(heading) else {
            continue;
        };
        let Some(url) = anchor.value().attr("href").and_then(decode_href) else {
            continue;
        };
        if is_on_domain(&url, DOMAIN) {
            continue;
        }
        let text = clean_text(&heading.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        let cite = anchor
            .select(&CITE_SEL)
            .next()
            .map(|c| clean_text(&c.text().collect::<String>()))
            .filter(|c| !c.is_empty());

        hits.push(WebHit {
            heading: text,
            url,
            cite,
        });
    }

    if hits.is_empty() {
        return Err(SearchError::NoResult("Google returned no organic results".into()));
    }
    Ok(WebResultSet { hits })
}

fn enclosing_anchor(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a")
}

static GOOGLE_ORIGIN: Lazy<Url> = Lazy::new(|| Url::parse("https://www.google.com/").unwrap());

/// Resolve a result link against the result page.
///
/// Google sometimes wraps targets as `/url?q=<target>&...`; the wrapper is
/// unwrapped so the hit carries the real destination.
fn decode_href(href: &str) -> Option<String> {
    let link = GOOGLE_ORIGIN.join(href.trim()).ok()?;
    let link = if is_on_domain(link.as_str(), DOMAIN) && link.path() == "/url" {
        let target = link
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        Url::parse(&target).ok()?
    } else {
        link
    };
    matches!(link.scheme(), "http" | "https").then(|| link.into())
}
