//! Mock search collaborators for testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;

use super::{
    BibliographicSearch, Publication, PublicationStream, SearchError, SearchFuture, WebResultSet,
    WebSearch,
};

/// Pop the next scripted response, repeating the last one once exhausted.
fn next_in<T: Clone>(seq: &Mutex<Vec<T>>, fallback: &T) -> T {
    let mut seq = seq.lock().unwrap();
    seq.pop().unwrap_or_else(|| fallback.clone())
}

fn reversed<T: Clone>(mut responses: Vec<T>) -> (Vec<T>, T) {
    assert!(
        !responses.is_empty(),
        "sequence must have at least one response"
    );
    responses.reverse();
    let fallback = responses.first().cloned().unwrap();
    (responses, fallback)
}

/// A hand-rolled [`BibliographicSearch`] for tests.
///
/// Each `search_by_title_year` call streams the next scripted item list.
/// Every item pulled from any stream is counted, so tests can assert how
/// far a scan went.
pub struct MockBibliographic {
    name: &'static str,
    streams: Mutex<Vec<Vec<Result<Publication, SearchError>>>>,
    stream_fallback: Vec<Result<Publication, SearchError>>,
    singles: Mutex<Vec<Result<Publication, SearchError>>>,
    single_fallback: Result<Publication, SearchError>,
    delay: Option<Duration>,
    stream_calls: AtomicUsize,
    single_calls: AtomicUsize,
    pulled: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockBibliographic {
    /// Every stream yields `items`; single-best fails with `NoResult`.
    pub fn new(name: &'static str, items: Vec<Result<Publication, SearchError>>) -> Self {
        Self {
            name,
            streams: Mutex::new(Vec::new()),
            stream_fallback: items,
            singles: Mutex::new(Vec::new()),
            single_fallback: Err(SearchError::NoResult("mock".into())),
            delay: None,
            stream_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            pulled: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Script one item list per stream call, repeating the last.
    pub fn with_stream_sequence(
        mut self,
        sequence: Vec<Vec<Result<Publication, SearchError>>>,
    ) -> Self {
        let (seq, fallback) = reversed(sequence);
        self.streams = Mutex::new(seq);
        self.stream_fallback = fallback;
        self
    }

    /// Script `search_single_best` responses, repeating the last.
    pub fn with_single_best(mut self, sequence: Vec<Result<Publication, SearchError>>) -> Self {
        let (seq, fallback) = reversed(sequence);
        self.singles = Mutex::new(seq);
        self.single_fallback = fallback;
        self
    }

    /// Latency applied before every streamed item and every single-best call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    /// Total candidates pulled from streams.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Titles passed to either search method, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl BibliographicSearch for MockBibliographic {
    fn name(&self) -> &str {
        self.name
    }

    fn search_by_title_year<'a>(
        &'a self,
        title: &'a str,
        _year_low: &'a str,
        _year_high: &'a str,
    ) -> PublicationStream<'a> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(title.to_string());
        let items = next_in(&self.streams, &self.stream_fallback);
        let delay = self.delay;

        futures_util::stream::iter(items)
            .then(move |item| async move {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                self.pulled.fetch_add(1, Ordering::SeqCst);
                item
            })
            .boxed()
    }

    fn search_single_best<'a>(&'a self, title: &'a str) -> SearchFuture<'a, Publication> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(title.to_string());
        let response = next_in(&self.singles, &self.single_fallback);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            response
        })
    }
}

/// A hand-rolled [`WebSearch`] for tests.
pub struct MockWeb {
    name: &'static str,
    domain: &'static str,
    responses: Mutex<Vec<Result<WebResultSet, SearchError>>>,
    fallback: Result<WebResultSet, SearchError>,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockWeb {
    /// A mock that always returns `response`.
    pub fn new(
        name: &'static str,
        domain: &'static str,
        response: Result<WebResultSet, SearchError>,
    ) -> Self {
        Self {
            name,
            domain,
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Script responses in order, repeating the last.
    pub fn with_sequence(mut self, responses: Vec<Result<WebResultSet, SearchError>>) -> Self {
        let (seq, fallback) = reversed(responses);
        self.responses = Mutex::new(seq);
        self.fallback = fallback;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl WebSearch for MockWeb {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> &str {
        self.domain
    }

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, WebResultSet> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        let response = next_in(&self.responses, &self.fallback);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            response
        })
    }
}
