use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::research::verify_research_one;
use crate::search::{BibliographicSearch, HttpContext, WebSearch, build_bibliographic, build_web};
use crate::web::verify_web_one;
use crate::{
    Category, Config, CoreError, ProgressEvent, ResearchCitation, VerificationResult, WebCitation,
};

type ProgressFn = dyn Fn(ProgressEvent) + Send + Sync;

/// Runs the research and web pipelines against a fixed set of collaborators.
pub struct Checker {
    config: Arc<Config>,
    bibliographic: Arc<dyn BibliographicSearch>,
    primary_web: Arc<dyn WebSearch>,
    secondary_web: Arc<dyn WebSearch>,
    progress: Option<Arc<ProgressFn>>,
}

impl Checker {
    /// Build the configured providers, sharing one HTTP client.
    pub fn from_config(config: Config) -> Result<Self, CoreError> {
        let http = HttpContext::new(&config)?;
        let bibliographic = build_bibliographic(&config, http.clone());
        let primary_web = build_web(config.primary_web, &config, http.clone())?;
        let secondary_web = build_web(config.secondary_web, &config, http)?;
        Ok(Self::with_backends(
            config,
            bibliographic,
            primary_web,
            secondary_web,
        ))
    }

    pub fn with_backends(
        config: Config,
        bibliographic: Arc<dyn BibliographicSearch>,
        primary_web: Arc<dyn WebSearch>,
        secondary_web: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bibliographic,
            primary_web,
            secondary_web,
            progress: None,
        }
    }

    /// Install a callback receiving [`ProgressEvent`]s.
    pub fn with_progress(mut self, progress: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify research citations. One result per input, in input order.
    pub async fn verify_research(
        &self,
        citations: &[ResearchCitation],
        cancel: &CancellationToken,
    ) -> Result<Vec<VerificationResult>, CoreError> {
        let scan_limit = self.config.scan_limit;
        let timeout = self.config.timeout();
        let bibliographic = self.bibliographic.as_ref();

        self.run_ordered(Category::Research, citations, cancel, |c| {
            (c.title.clone(), verify_research_one(c, bibliographic, scan_limit, timeout))
        })
        .await
    }

    /// Verify web citations. One result per input, in input order.
    pub async fn verify_web(
        &self,
        citations: &[WebCitation],
        cancel: &CancellationToken,
    ) -> Result<Vec<VerificationResult>, CoreError> {
        let scan_limit = self.config.scan_limit;
        let timeout = self.config.timeout();
        let primary = self.primary_web.as_ref();
        let secondary = self.secondary_web.as_ref();

        self.run_ordered(Category::Web, citations, cancel, |c| {
            (
                c.title.clone(),
                verify_web_one(c, primary, secondary, scan_limit, timeout),
            )
        })
        .await
    }

    /// Run `verify` over `items` with at most `num_workers` in flight.
    ///
    /// Output order matches input order regardless of completion order.
    /// Cancellation discards everything already collected.
    async fn run_ordered<'a, T, F, Fut>(
        &self,
        category: Category,
        items: &'a [T],
        cancel: &CancellationToken,
        verify: F,
    ) -> Result<Vec<VerificationResult>, CoreError>
    where
        F: Fn(&'a T) -> (String, Fut),
        Fut: Future<Output = VerificationResult> + 'a,
    {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let num_workers = self.config.num_workers.max(1);
        tracing::info!(%category, total, num_workers, "verifying citations");

        let progress = self.progress.clone();
        let work = futures_util::stream::iter(items.iter().enumerate())
            .map(|(index, item)| {
                let (title, fut) = verify(item);
                let progress = progress.clone();
                async move {
                    if let Some(p) = &progress {
                        p(ProgressEvent::Checking {
                            category,
                            index,
                            total,
                            title,
                        });
                    }
                    let result = fut.await;
                    if let Some(p) = &progress {
                        p(ProgressEvent::Result {
                            index,
                            total,
                            result: Box::new(result.clone()),
                        });
                    }
                    result
                }
            })
            .buffered(num_workers)
            .collect::<Vec<_>>();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(%category, "verification cancelled");
                Err(CoreError::Cancelled)
            }
            results = work => Ok(results),
        }
    }
}
