//! Per-provider request pacing with adaptive governor instances.
//!
//! Every scraping request waits for its provider's permit via `until_ready()`.
//! On 429 the provider's governor is slowed and the error is returned
//! immediately; the caller falls back instead of retrying.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::search::SearchError;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Longest slowdown applied after repeated 429s.
const MAX_SLOWDOWN: u32 = 16;

/// Quiet period after which the base rate is restored.
const DECAY_AFTER: Duration = Duration::from_secs(60);

/// Rate limiter whose period can be widened at runtime.
///
/// When a 429 is received, the governor is atomically swapped to a slower rate.
/// After [`DECAY_AFTER`] with no 429s, the original rate is restored.
pub struct AdaptiveLimiter {
    limiter: ArcSwap<DirectLimiter>,
    base_period: Duration,
    /// 1 = normal, 2 = half rate, etc.
    current_factor: AtomicU32,
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl AdaptiveLimiter {
    /// Create a limiter allowing one request per `period`.
    ///
    /// A zero period is clamped to one millisecond.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            limiter: ArcSwap::from(Arc::new(direct(period))),
            base_period: period,
            current_factor: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    pub fn per_second(n: u32) -> Self {
        let ms = 1000 / n.max(1) as u64;
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the limiter allows a request.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Double the slowdown factor and swap in a slower governor.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }

        let _ = self
            .current_factor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(MAX_SLOWDOWN))
            });

        let factor = self.current_factor.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            self.limiter.store(Arc::new(direct(scaled)));
        }
    }

    pub fn slowdown_factor(&self) -> u32 {
        self.current_factor.load(Ordering::SeqCst)
    }

    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed() >= DECAY_AFTER))
            .unwrap_or(false);

        if should_restore && self.current_factor.load(Ordering::SeqCst) > 1 {
            self.current_factor.store(1, Ordering::SeqCst);
            self.limiter.store(Arc::new(direct(self.base_period)));
        }
    }
}

fn direct(period: Duration) -> DirectLimiter {
    // `period` is never zero here (clamped in `new`, scaled by factor >= 1).
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(std::num::NonZeroU32::MIN));
    DirectLimiter::direct(quota)
}

/// Collection of per-provider rate limiters, keyed by provider name.
pub struct RateLimiters {
    limiters: HashMap<&'static str, AdaptiveLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        let mut limiters = HashMap::new();

        // Scholar blocks bursty clients quickly; one request every 2 seconds.
        limiters.insert(
            crate::search::google_scholar::NAME,
            AdaptiveLimiter::new(Duration::from_secs(2)),
        );
        limiters.insert(crate::search::google::NAME, AdaptiveLimiter::per_second(1));
        limiters.insert(crate::search::bing::NAME, AdaptiveLimiter::per_second(1));
        // OpenAlex: 10/s documented, light governor so backoff kicks in on 429
        limiters.insert(crate::search::openalex::NAME, AdaptiveLimiter::per_second(10));
        // SearxNG is self-hosted; no limiter

        Self { limiters }
    }
}

impl RateLimiters {
    /// An empty set: every provider runs unthrottled.
    pub fn unlimited() -> Self {
        Self {
            limiters: HashMap::new(),
        }
    }

    pub fn get(&self, provider: &str) -> Option<&AdaptiveLimiter> {
        self.limiters.get(provider)
    }
}

/// Map a 429 response to [`SearchError::RateLimited`], extracting Retry-After.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), SearchError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(SearchError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: use a conservative fixed wait
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}
