//! Google Scholar, scraped from its HTML result pages.
//!
//! Scholar has no public API. Result pages are fetched one at a time as the
//! consumer pulls from the stream, so a scan bounded at five candidates costs
//! a single request.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{
    BibliographicSearch, HttpContext, Publication, PublicationStream, SearchError, SearchFuture,
    clean_text, paged_stream,
};

pub const NAME: &str = "Google Scholar";

const BASE_URL: &str = "https://scholar.google.com/scholar";
const PAGE_SIZE: usize = 10;
/// Hard stop for consumers that drain the stream.
const MAX_PAGES: usize = 10;

pub struct GoogleScholar {
    http: HttpContext,
}

impl GoogleScholar {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    fn search_url(title: &str, years: Option<(&str, &str)>, start: usize) -> String {
        let mut url = format!("{}?hl=en&q={}", BASE_URL, urlencoding::encode(title));
        if let Some((low, high)) = years {
            url.push_str(&format!("&as_ylo={}&as_yhi={}", low, high));
        }
        if start > 0 {
            url.push_str(&format!("&start={}", start));
        }
        url
    }

    async fn fetch_page(
        &self,
        title: &str,
        years: Option<(&str, &str)>,
        start: usize,
    ) -> Result<Vec<Publication>, SearchError> {
        let url = Self::search_url(title, years, start);
        let html = self.http.get_text(NAME, &url).await?;
        parse_results(&html)
    }
}

impl BibliographicSearch for GoogleScholar {
    fn name(&self) -> &str {
        NAME
    }

    fn search_by_title_year<'a>(
        &'a self,
        title: &'a str,
        year_low: &'a str,
        year_high: &'a str,
    ) -> PublicationStream<'a> {
        paged_stream(PAGE_SIZE, MAX_PAGES, move |page| {
            self.fetch_page(title, Some((year_low, year_high)), page * PAGE_SIZE)
        })
    }

    fn search_single_best<'a>(&'a self, title: &'a str) -> SearchFuture<'a, Publication> {
        Box::pin(async move {
            self.fetch_page(title, None, 0)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| SearchError::NoResult(title.to_string()))
        })
    }
}

static RESULT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.gs_ri").unwrap());
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.gs_rt").unwrap());
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.gs_rt a").unwrap());
static BYLINE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.gs_a").unwrap());
static CAPTCHA_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#gs_captcha_ccl, #captcha-form, form#captcha").unwrap());

/// Leading type markers Scholar prints in headings: `[PDF]`, `[HTML]`, `[BOOK][B]`, `[CITATION][C]`.
static TYPE_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\[[A-Z]+\]\s*)+").unwrap());

/// Parse a Scholar result page into publications, in rank order.
pub(crate) fn parse_results(html: &str) -> Result<Vec<Publication>, SearchError> {
    let document = Html::parse_document(html);

    if document.select(&CAPTCHA_SEL).next().is_some() {
        return Err(SearchError::Blocked("Google Scholar captcha".into()));
    }

    let mut publications = Vec::new();
    for entry in document.select(&RESULT_SEL) {
        let Some(heading) = entry.select(&TITLE_SEL).next() else {
            continue;
        };
        let raw_title = clean_text(&heading.text().collect::<String>());
        let title = TYPE_MARKERS.replace(&raw_title, "").trim().to_string();
        if title.is_empty() {
            continue;
        }

        let url = entry
            .select(&LINK_SEL)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(String::from);

        let authors = entry
            .select(&BYLINE_SEL)
            .next()
            .map(|b| parse_byline_authors(&b.text().collect::<String>()))
            .unwrap_or_default();

        publications.push(Publication {
            title,
            authors,
            url,
        });
    }

    Ok(publications)
}

/// Authors from a byline like `"CM Bishop, NM Nasrabadi - 2006 - Springer"`.
fn parse_byline_authors(byline: &str) -> Vec<String> {
    let byline = clean_text(byline);
    let names = byline.split(" - ").next().unwrap_or("");
    names
        .split(',')
        .map(|a| a.trim().trim_matches('…').trim())
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="gs_r gs_or gs_scl">
          <div class="gs_ri">
            <h3 class="gs_rt"><span class="gs_ctg2">[PDF]</span>
              <a href="https://link.springer.com/book/9780387310732">Pattern recognition and machine learning</a></h3>
            <div class="gs_a">CM Bishop, NM Nasrabadi - 2006 - Springer</div>
          </div>
        </div>
        <div class="gs_r gs_or gs_scl">
          <div class="gs_ri">
            <h3 class="gs_rt"><span class="gs_ctu"><span class="gs_ct1">[CITATION]</span><span class="gs_ct2">[C]</span></span>
              Pattern recognition</h3>
            <div class="gs_a">CM Bishop, …&nbsp;- Springer, 2006</div>
          </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_results_in_rank_order() {
        let pubs = parse_results(PAGE).unwrap();
        assert_eq!(pubs.len(), 2);
        assert_eq!(pubs[0].title, "Pattern recognition and machine learning");
        assert_eq!(
            pubs[0].url.as_deref(),
            Some("https://link.springer.com/book/9780387310732")
        );
        assert_eq!(pubs[0].authors, vec!["CM Bishop", "NM Nasrabadi"]);
    }

    #[test]
    fn strips_type_markers_and_handles_unlinked_citations() {
        let pubs = parse_results(PAGE).unwrap();
        assert_eq!(pubs[1].title, "Pattern recognition");
        assert_eq!(pubs[1].url, None);
        assert_eq!(pubs[1].authors, vec!["CM Bishop"]);
    }

    #[test]
    fn captcha_page_is_blocked() {
        let html = r#"<html><body><div id="gs_captcha_ccl">robot check</div></body></html>"#;
        assert!(matches!(parse_results(html), Err(SearchError::Blocked(_))));
    }

    #[test]
    fn empty_page_yields_no_results() {
        assert!(parse_results("<html><body></body></html>").unwrap().is_empty());
    }

    #[test]
    fn search_url_carries_year_bounds() {
        let url = GoogleScholar::search_url("Deep learning", Some(("2016", "2016")), 10);
        assert_eq!(
            url,
            "https://scholar.google.com/scholar?hl=en&q=Deep%20learning&as_ylo=2016&as_yhi=2016&start=10"
        );
        let url = GoogleScholar::search_url("Deep learning", None, 0);
        assert_eq!(url, "https://scholar.google.com/scholar?hl=en&q=Deep%20learning");
    }
}
