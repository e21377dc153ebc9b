//! Error types for the fetch module.
//!
//! Every variant carries the URL it concerns so that a failed [`FetchOutcome`]
//! can be logged and reported without extra bookkeeping.
//!
//! [`FetchOutcome`]: super::FetchOutcome

use thiserror::Error;

/// Errors that can occur while fetching a document over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to fetch.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Any response status other than 200.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provided URL is malformed or uses an unsupported scheme.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The fetch task ended without producing a response (panic or closed limiter).
    #[error("fetch task for {url} did not complete: {reason}")]
    TaskFailed {
        /// The URL the task was fetching.
        url: String,
        /// Why the task ended.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// Creates an error from a reqwest send/body error, classifying timeouts
    /// and request-building failures.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_builder() {
            Self::InvalidUrl { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a task failure error.
    pub fn task_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the URL this error concerns, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::InvalidUrl { url }
            | Self::TaskFailed { url, .. } => Some(url),
            Self::ClientBuild(_) => None,
        }
    }

    /// Returns the HTTP status for [`FetchError::HttpStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport errors and every non-200 status are retryable; a malformed URL
    /// or a dead task is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/p/1");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/p/1"));
    }

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/p/1", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("https://example.com/p/1"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_invalid_url_display() {
        let error = FetchError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_url_and_status_accessors() {
        let error = FetchError::http_status("https://example.com/a", 404);
        assert_eq!(error.url(), Some("https://example.com/a"));
        assert_eq!(error.status(), Some(404));

        let error = FetchError::timeout("https://example.com/b");
        assert_eq!(error.url(), Some("https://example.com/b"));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_fetch_error_retryable_classification() {
        assert!(FetchError::timeout("u").is_retryable());
        assert!(FetchError::http_status("u", 404).is_retryable());
        assert!(FetchError::http_status("u", 503).is_retryable());
        assert!(!FetchError::invalid_url("u").is_retryable());
        assert!(!FetchError::task_failed("u", "panicked").is_retryable());
    }
}
