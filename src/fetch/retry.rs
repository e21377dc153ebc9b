//! Fixed-interval retry policy for page fetches.
//!
//! A failed attempt is retried after a constant delay until the attempt
//! budget is spent. The delay does not grow between attempts and carries no
//! jitter.
//!
//! # Example
//!
//! ```
//! use harvester_core::fetch::{FetchError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let error = FetchError::http_status("https://example.com/p/1", 503);
//!
//! match policy.should_retry(&error, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason, .. } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::debug;

use super::FetchError;
use super::constants::RETRY_DELAY;

/// Default number of attempts per URL, including the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the fetch after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the fetch.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
        /// Whether the attempt budget was used up (as opposed to giving up early).
        exhausted: bool,
    },
}

/// Configuration for retry behaviour.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `delay`: 2 seconds between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Wait between consecutive attempts.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with an explicit attempt budget (clamped to at least 1)
    /// and inter-attempt delay.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a policy with a custom attempt budget and the default delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, RETRY_DELAY)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the wait between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed with `error`.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: format!("not retryable: {error}"),
                exhausted: false,
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
                exhausted: true,
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}
