use super::{
    BibliographicSearch, HttpContext, Publication, PublicationStream, SearchError, SearchFuture,
    paged_stream,
};

pub const NAME: &str = "OpenAlex";

const BASE_URL: &str = "https://api.openalex.org/works";
const PAGE_SIZE: usize = 25;
const MAX_PAGES: usize = 4;

/// OpenAlex works API. An alternative to Google Scholar that is not scraped.
pub struct OpenAlex {
    http: HttpContext,
    mailto: Option<String>,
}

impl OpenAlex {
    pub fn new(http: HttpContext, mailto: Option<String>) -> Self {
        Self { http, mailto }
    }

    fn search_url(&self, title: &str, years: Option<(&str, &str)>, page: usize) -> String {
        let mut url = format!(
            "{}?search={}&per-page={}&page={}",
            BASE_URL,
            urlencoding::encode(title),
            PAGE_SIZE,
            page + 1
        );
        if let Some((low, high)) = years {
            let filter = if low == high {
                format!("publication_year:{}", low)
            } else {
                format!("publication_year:{}-{}", low, high)
            };
            url.push_str(&format!("&filter={}", filter));
        }
        if let Some(ref email) = self.mailto {
            url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
        }
        url
    }

    async fn fetch_page(
        &self,
        title: &str,
        years: Option<(&str, &str)>,
        page: usize,
    ) -> Result<Vec<Publication>, SearchError> {
        let url = self.search_url(title, years, page);
        let data = self.http.get_json(NAME, &url).await?;
        parse_works(&data)
    }
}

impl BibliographicSearch for OpenAlex {
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
            self.fetch_page(title, Some((year_low, year_high)), page)
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

fn parse_works(data: &serde_json::Value) -> Result<Vec<Publication>, SearchError> {
    let results = data["results"]
        .as_array()
        .ok_or_else(|| SearchError::Parse("missing `results` array".into()))?;

    Ok(results
        .iter()
        .filter_map(|item| {
            let title = item["title"]
                .as_str()
                .or_else(|| item["display_name"].as_str())?
                .trim();
            if title.is_empty() {
                return None;
            }

            let authors: Vec<String> = item["authorships"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|a| a["author"]["display_name"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();

            let url = item["doi"]
                .as_str()
                .or_else(|| item["primary_location"]["landing_page_url"].as_str())
                .or_else(|| item["id"].as_str())
                .map(String::from);

            Some(Publication {
                title: title.to_string(),
                authors,
                url,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn parses_works_payload() {
        let data = serde_json::json!({
            "results": [
                {
                    "id": "https://openalex.org/W1",
                    "title": "Pattern Recognition and Machine Learning",
                    "doi": "https://doi.org/10.1007/978-0-387-45528-0",
                    "authorships": [{"author": {"display_name": "Christopher M. Bishop"}}]
                },
                {
                    "id": "https://openalex.org/W2",
                    "title": null,
                    "display_name": "Untitled fallback",
                    "authorships": []
                },
                {"id": "https://openalex.org/W3", "title": "  "}
            ]
        });
        let works = parse_works(&data).unwrap();
        assert_eq!(works.len(), 2);
        assert_eq!(works[0].authors, vec!["Christopher M. Bishop"]);
        assert_eq!(
            works[0].url.as_deref(),
            Some("https://doi.org/10.1007/978-0-387-45528-0")
        );
        assert_eq!(works[1].title, "Untitled fallback");
        assert_eq!(works[1].url.as_deref(), Some("https://openalex.org/W2"));
    }

    #[test]
    fn missing_results_is_a_parse_error() {
        let data = serde_json::json!({"error": "bad filter"});
        assert!(matches!(parse_works(&data), Err(SearchError::Parse(_))));
    }

    #[test]
    fn search_url_filters_single_year() {
        let config = Config::default();
        let oa = OpenAlex::new(HttpContext::new(&config).unwrap(), Some("a@b.org".into()));
        let url = oa.search_url("Deep learning", Some(("2016", "2016")), 0);
        assert!(url.contains("search=Deep%20learning"));
        assert!(url.contains("&page=1"));
        assert!(url.contains("&filter=publication_year:2016"));
        assert!(url.ends_with("&mailto=a%40b.org"));

        let url = oa.search_url("Deep learning", Some(("2015", "2016")), 1);
        assert!(url.contains("&page=2"));
        assert!(url.contains("publication_year:2015-2016"));
    }
}
