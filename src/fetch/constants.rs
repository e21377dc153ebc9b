//! Constants for the fetch module (timeouts, retry spacing, concurrency bounds).

use std::time::Duration;

/// Total time allowed for one HTTP attempt, connect through body (30 seconds).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed wait between attempts on the same URL (2 seconds, non-exponential).
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Warning threshold for cumulative crawl-delay wait per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Largest robots.txt crawl delay honoured (1 hour).
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(3600);
