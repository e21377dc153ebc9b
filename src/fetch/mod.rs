//! HTTP fetching: shared client, retry policy and the concurrent fetch engine.
//!
//! # Features
//!
//! - One pooled client with browser headers and a 30s per-request timeout
//! - Bounded-concurrency page fetches (semaphore, default 10)
//! - Fixed 2s retry delay, 3 attempts per URL by default
//! - Optional per-host crawl-delay spacing
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::fetch::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let xml = client.get_text("https://example.com/sitemap.xml").await?;
//! println!("{} bytes", xml.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
pub mod rate_limiter;
mod retry;

pub use client::HttpClient;
pub use constants::{REQUEST_TIMEOUT, RETRY_DELAY};
pub use engine::{DEFAULT_CONCURRENCY, EngineError, FetchEngine, FetchOutcome, FetchStats};
pub use error::FetchError;
pub use rate_limiter::{RateLimiter, extract_host};
pub use retry::{DEFAULT_MAX_RETRIES, RetryDecision, RetryPolicy};
