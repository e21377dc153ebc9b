//! HTTP client wrapper for text documents.
//!
//! This module provides the `HttpClient` struct, a thin cloneable handle over a
//! pooled `reqwest::Client` with the crawler's timeout and browser headers.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::constants::REQUEST_TIMEOUT;
use super::error::FetchError;
use crate::user_agent;

/// HTTP client for fetching robots.txt, sitemap XML and product pages.
///
/// This client is designed to be created once per run and cloned into tasks,
/// taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use harvester_core::fetch::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let body = client.get_text("https://example.com/robots.txt").await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with the default 30 second per-request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client with an explicit total timeout per request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the TLS backend or resolver
    /// cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(user_agent::default_headers())
            .gzip(true)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client, timeout })
    }

    /// Returns the per-request timeout this client enforces.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issues one GET and returns the body when the server answers 200.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns any status other than 200
    /// - The body cannot be read
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "non-200 response");
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "response body read");
        Ok(body)
    }
}
