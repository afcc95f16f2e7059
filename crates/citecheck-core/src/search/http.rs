//! Shared HTTP plumbing for the scraping and API providers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};

use super::SearchError;
use crate::rate_limit::{RateLimiters, check_rate_limit_response};
use crate::{Config, CoreError, ScrapeIdentity};

/// Client, identity and pacing shared by every provider built from one [`Config`].
#[derive(Clone)]
pub struct HttpContext {
    pub client: reqwest::Client,
    pub identity: ScrapeIdentity,
    pub timeout: Duration,
    pub rate_limiters: Arc<RateLimiters>,
}

impl HttpContext {
    pub fn new(config: &Config) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            identity: config.identity.clone(),
            timeout: config.timeout(),
            rate_limiters: Arc::clone(&config.rate_limiters),
        })
    }

    /// GET `url` on behalf of `provider` and return the body.
    ///
    /// 1. Waits for the provider's rate limiter permit, if it has one
    /// 2. Sends the request with the scraping identity headers
    /// 3. On 429: slows the provider's limiter and returns `RateLimited`
    /// 4. Any other non-2xx status becomes `Status`
    pub async fn get_text(&self, provider: &str, url: &str) -> Result<String, SearchError> {
        let limiter = self.rate_limiters.get(provider);
        if let Some(lim) = limiter {
            lim.acquire().await;
        }

        tracing::debug!(provider, url, "GET");
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.identity.user_agent)
            .header(ACCEPT_LANGUAGE, &self.identity.accept_language)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.timeout)
                } else {
                    SearchError::from(e)
                }
            })?;

        if let Err(e) = check_rate_limit_response(&resp) {
            if let Some(lim) = limiter {
                lim.on_rate_limited();
            }
            tracing::warn!(provider, "rate limited");
            return Err(e);
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        Ok(resp.text().await?)
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(
        &self,
        provider: &str,
        url: &str,
    ) -> Result<serde_json::Value, SearchError> {
        let body = self.get_text(provider, url).await?;
        serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))
    }
}
