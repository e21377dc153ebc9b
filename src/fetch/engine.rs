//! Fetch engine for concurrent page fetches with retry support.
//!
//! This module provides the `FetchEngine` which fetches many pages at once
//! using a semaphore-based concurrency limit, retrying failed attempts after a
//! fixed delay.
//!
//! # Overview
//!
//! Every URL handed to [`FetchEngine::fetch_many`] gets its own Tokio task and
//! yields exactly one [`FetchOutcome`]. A permit is taken from the shared
//! semaphore for each HTTP attempt and released before the retry sleep, so a
//! URL that is backing off never holds a slot.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use harvester_core::fetch::{FetchEngine, HttpClient, RateLimiter, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = FetchEngine::new(10, RetryPolicy::default(), Arc::new(RateLimiter::new()))?;
//! let client = HttpClient::new();
//! let outcomes = engine
//!     .fetch_many(&client, vec!["https://example.com/p/1".to_string()])
//!     .await;
//! println!("fetched {} pages", outcomes.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::rate_limiter::RateLimiter;
use super::retry::{RetryDecision, RetryPolicy};
use super::{FetchError, HttpClient};

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Error type for fetch engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Result of fetching one URL.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 200.
    Success {
        /// The fetched URL.
        url: String,
        /// Response body as text.
        body: String,
        /// HTTP status (always 200).
        status: u16,
    },
    /// No usable response for this URL.
    Failure {
        /// The URL that could not be fetched.
        url: String,
        /// The error from the final attempt.
        error: FetchError,
        /// Whether every allowed attempt was spent.
        attempts_exhausted: bool,
    },
}

impl FetchOutcome {
    /// Returns the URL this outcome belongs to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Success { url, .. } | Self::Failure { url, .. } => url,
        }
    }

    /// Returns true for [`FetchOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Counters across every fetch made by one engine.
///
/// Uses atomic counters so concurrent fetch tasks can update them.
#[derive(Debug, Default)]
pub struct FetchStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl FetchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of URLs fetched successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of URLs that ended in failure.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the total number of URLs processed (succeeded + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    /// Returns the number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fetch engine for concurrent page fetches with retry support.
///
/// One engine is meant to be shared (via `Arc`) by every base URL in a run,
/// so its semaphore bounds the total number of in-flight page requests.
///
/// # Concurrency Model
///
/// - Each URL runs in its own Tokio task; task creation is unbounded
/// - A semaphore permit is acquired before every HTTP attempt
/// - The permit is dropped before the retry sleep (RAII)
/// - A failing URL never aborts or delays the others
#[derive(Debug)]
pub struct FetchEngine {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
    /// Retry policy for failed attempts.
    retry_policy: RetryPolicy,
    /// Per-host crawl-delay limiter.
    rate_limiter: Arc<RateLimiter>,
    /// Run-wide counters.
    stats: Arc<FetchStats>,
}

impl FetchEngine {
    /// Creates a new fetch engine.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of in-flight requests (1-100)
    /// * `retry_policy` - Attempt budget and inter-attempt delay
    /// * `rate_limiter` - Per-host crawl-delay limiter shared with the pipeline
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(retry_policy, rate_limiter))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            retry_delay_ms = retry_policy.delay().as_millis(),
            "creating fetch engine"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry_policy,
            rate_limiter,
            stats: Arc::new(FetchStats::new()),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the crawl-delay limiter consulted before every attempt.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Returns run-wide counters.
    #[must_use]
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Fetches a single URL, retrying until it succeeds or the budget is spent.
    pub async fn fetch_one(&self, client: &HttpClient, url: &str) -> FetchOutcome {
        fetch_with_retry(
            client,
            url,
            &self.semaphore,
            &self.retry_policy,
            &self.rate_limiter,
            &self.stats,
        )
        .await
    }

    /// Fetches every URL concurrently and returns one outcome per input URL,
    /// in input order.
    ///
    /// Individual failures never cause this method to fail; they come back as
    /// [`FetchOutcome::Failure`].
    #[instrument(skip(self, client, urls), fields(url_count = urls.len()))]
    pub async fn fetch_many(&self, client: &HttpClient, urls: Vec<String>) -> Vec<FetchOutcome> {
        let mut handles = Vec::with_capacity(urls.len());

        info!(concurrency = self.concurrency, "starting page fetches");

        for url in urls {
            let client = client.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let retry_policy = self.retry_policy.clone();
            let rate_limiter = Arc::clone(&self.rate_limiter);
            let stats = Arc::clone(&self.stats);
            let task_url = url.clone();

            let handle = tokio::spawn(async move {
                fetch_with_retry(
                    &client,
                    &task_url,
                    &semaphore,
                    &retry_policy,
                    &rate_limiter,
                    &stats,
                )
                .await
            });
            handles.push((url, handle));
        }

        debug!(task_count = handles.len(), "waiting for fetches to complete");

        let mut outcomes = Vec::with_capacity(handles.len());
        for (url, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(url = %url, error = %e, "fetch task panicked");
                    self.stats.increment_failed();
                    outcomes.push(FetchOutcome::Failure {
                        error: FetchError::task_failed(&url, e.to_string()),
                        url,
                        attempts_exhausted: false,
                    });
                }
            }
        }

        info!(
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            failed = outcomes.iter().filter(|o| !o.is_success()).count(),
            "page fetches complete"
        );

        outcomes
    }
}

/// Fetches a URL with the fixed-delay retry loop.
///
/// The permit is scoped to the HTTP call: it is acquired after the crawl-delay
/// wait and dropped before any retry sleep.
#[instrument(skip(client, semaphore, policy, rate_limiter, stats), fields(url = %url))]
async fn fetch_with_retry(
    client: &HttpClient,
    url: &str,
    semaphore: &Semaphore,
    policy: &RetryPolicy,
    rate_limiter: &RateLimiter,
    stats: &FetchStats,
) -> FetchOutcome {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(attempt, "attempting fetch");

        rate_limiter.acquire(url).await;

        let result = {
            let Ok(_permit) = semaphore.acquire().await else {
                stats.increment_failed();
                return FetchOutcome::Failure {
                    url: url.to_string(),
                    error: FetchError::task_failed(url, "concurrency limiter closed"),
                    attempts_exhausted: false,
                };
            };
            client.get_text(url).await
        };

        let error = match result {
            Ok(body) => {
                info!(url = %url, attempt, "fetched page");
                stats.increment_succeeded();
                return FetchOutcome::Success {
                    url: url.to_string(),
                    body,
                    status: 200,
                };
            }
            Err(e) => e,
        };

        warn!(url = %url, attempt, error = %error, "fetch attempt failed");

        match policy.should_retry(&error, attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                debug!(
                    next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    "retrying fetch"
                );
                stats.increment_retried();
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason, exhausted } => {
                if exhausted {
                    warn!(url = %url, attempts = attempt, "all fetch attempts failed");
                } else {
                    warn!(url = %url, %reason, "giving up on fetch");
                }
                stats.increment_failed();
                return FetchOutcome::Failure {
                    url: url.to_string(),
                    error,
                    attempts_exhausted: exhausted,
                };
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_rate_limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new())
    }

    #[test]
    fn test_engine_new_valid_concurrency() {
        let engine = FetchEngine::new(1, RetryPolicy::default(), test_rate_limiter()).unwrap();
        assert_eq!(engine.concurrency(), 1);

        let engine = FetchEngine::new(10, RetryPolicy::default(), test_rate_limiter()).unwrap();
        assert_eq!(engine.concurrency(), 10);

        let engine = FetchEngine::new(100, RetryPolicy::default(), test_rate_limiter()).unwrap();
        assert_eq!(engine.concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency_zero() {
        let result = FetchEngine::new(0, RetryPolicy::default(), test_rate_limiter());
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_engine_new_invalid_concurrency_too_high() {
        let result = FetchEngine::new(101, RetryPolicy::default(), test_rate_limiter());
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_engine_stores_retry_policy() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let engine = FetchEngine::new(10, policy, test_rate_limiter()).unwrap();
        assert_eq!(engine.retry_policy().max_attempts(), 5);
        assert_eq!(engine.retry_policy().delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_fetch_stats_increment() {
        let stats = FetchStats::new();

        stats.increment_succeeded();
        stats.increment_succeeded();
        stats.increment_failed();
        stats.increment_retried();

        assert_eq!(stats.succeeded(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.retried(), 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_fetch_outcome_accessors() {
        let ok = FetchOutcome::Success {
            url: "https://example.com/a".to_string(),
            body: String::new(),
            status: 200,
        };
        assert!(ok.is_success());
        assert_eq!(ok.url(), "https://example.com/a");

        let failed = FetchOutcome::Failure {
            url: "https://example.com/b".to_string(),
            error: FetchError::timeout("https://example.com/b"),
            attempts_exhausted: true,
        };
        assert!(!failed.is_success());
        assert_eq!(failed.url(), "https://example.com/b");
    }

    #[tokio::test]
    async fn test_fetch_one_invalid_url_fails_without_retry() {
        let engine = FetchEngine::new(
            2,
            RetryPolicy::new(3, Duration::from_millis(1)),
            test_rate_limiter(),
        )
        .unwrap();
        let client = HttpClient::new();

        let outcome = engine.fetch_one(&client, "not a url").await;

        match outcome {
            FetchOutcome::Failure {
                error,
                attempts_exhausted,
                ..
            } => {
                assert!(matches!(error, FetchError::InvalidUrl { .. }));
                assert!(!attempts_exhausted);
            }
            FetchOutcome::Success { .. } => panic!("invalid URL must not succeed"),
        }
        assert_eq!(engine.stats().retried(), 0);
        assert_eq!(engine.stats().failed(), 1);
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }
}
