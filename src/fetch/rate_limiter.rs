//! Per-host crawl-delay enforcement for page fetches.
//!
//! robots.txt may declare a `Crawl-delay` for a site. When the crawl is run
//! with delay enforcement on, the pipeline registers that delay here and the
//! fetch engine calls [`RateLimiter::acquire`] before every attempt.
//!
//! Hosts without a registered delay are never slowed down, so a fresh limiter
//! is a no-op.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use harvester_core::fetch::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new());
//! limiter.set_delay("shop.example.com", Duration::from_secs(1));
//!
//! // First request proceeds immediately
//! limiter.acquire("https://shop.example.com/p/1").await;
//!
//! // Second request to the same host waits for the delay
//! limiter.acquire("https://shop.example.com/p/2").await;
//!
//! // Hosts without a declared delay are not limited
//! limiter.acquire("https://other.example.org/p/1").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_CRAWL_DELAY};

/// Per-host spacing of requests.
///
/// Wrapped in `Arc` and shared by every fetch task. Per-host state lives in a
/// `DashMap`; the last-request timestamp sits behind a `tokio::sync::Mutex` so
/// that check-then-update is atomic across tasks.
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// Per-host state, only present for hosts with a registered delay.
    /// Values are `Arc` so the map shard lock is released before awaiting.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    delay: Duration,
    /// `None` until the first request to this host.
    last_request: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a limiter with no registered hosts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the minimum spacing between requests to `host`.
    ///
    /// Delays above one hour are capped. A zero delay removes the host.
    #[instrument(skip(self), fields(delay_ms = delay.as_millis()))]
    pub fn set_delay(&self, host: &str, delay: Duration) {
        let host = host.to_lowercase();
        if delay.is_zero() {
            self.hosts.remove(&host);
            return;
        }
        let delay = if delay > MAX_CRAWL_DELAY {
            warn!(
                host = %host,
                delay_secs = delay.as_secs(),
                max_secs = MAX_CRAWL_DELAY.as_secs(),
                "crawl delay exceeds maximum, capping at 1 hour"
            );
            MAX_CRAWL_DELAY
        } else {
            delay
        };
        debug!(host = %host, "registered crawl delay");
        self.hosts.insert(host, Arc::new(HostState::new(delay)));
    }

    /// Returns the delay registered for `host`, if any.
    #[must_use]
    pub fn delay_for(&self, host: &str) -> Option<Duration> {
        self.hosts.get(&host.to_lowercase()).map(|s| s.delay)
    }

    /// Waits until a request to the URL's host is permitted, then records it.
    ///
    /// The first request to any host proceeds immediately.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let Some(state) = self.hosts.get(&host).map(|s| Arc::clone(&s)) else {
            return;
        };

        let mut last_request_guard = state.last_request.lock().await;

        if let Some(last_request) = *last_request_guard {
            let elapsed = last_request.elapsed();
            if elapsed < state.delay {
                let delay = state.delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying crawl delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "crawl delay is dominating run time for this host"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        }

        *last_request_guard = Some(Instant::now());
    }
}

/// Extracts the lowercase host from a URL.
///
/// Returns "unknown" for malformed URLs.
///
/// # Examples
///
/// ```
/// use harvester_core::fetch::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://Shop.Example.com/p/1"), "shop.example.com");
/// assert_eq!(extract_host("http://localhost:8080/x"), "localhost");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
