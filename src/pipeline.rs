//! End-to-end crawl of one or more base URLs.
//!
//! For each base URL the pipeline reads robots.txt, resolves the sitemaps,
//! fetches every allowed page through the shared [`FetchEngine`], extracts
//! product records and writes them to CSV. Base URLs run concurrently and
//! share one engine, so the concurrency limit bounds the whole run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::extract::{ProductRecord, extract};
use crate::fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, EngineError, FetchEngine, FetchError,
    FetchOutcome, HttpClient, REQUEST_TIMEOUT, RETRY_DELAY, RateLimiter, RetryPolicy,
    extract_host,
};
use crate::robots::PolicyResolver;
use crate::sink::{CsvSink, DEFAULT_OUTPUT_DIR, SinkError};
use crate::sitemap::{SitemapOptions, SitemapResolver, seed_urls};

/// Extensions of locations that are never fetched as pages.
pub const IMAGE_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp"];

/// Errors that abort a single base URL.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] FetchError),
}

/// Run settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub concurrency: usize,
    /// Attempts per page, including the first.
    pub retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub sitemap: SitemapOptions,
    /// Space requests to a host by its robots.txt crawl delay.
    pub respect_crawl_delay: bool,
    pub output_dir: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            request_timeout: REQUEST_TIMEOUT,
            sitemap: SitemapOptions::default(),
            respect_crawl_delay: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// What happened to one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlReport {
    pub base_url: String,
    /// Page URLs kept after robots and image filtering.
    pub pages_discovered: usize,
    pub fetched: usize,
    pub failed: usize,
    pub records: usize,
    /// CSV path, `None` when nothing was written.
    pub output: Option<PathBuf>,
}

impl BaseUrlReport {
    fn empty(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            pages_discovered: 0,
            fetched: 0,
            failed: 0,
            records: 0,
            output: None,
        }
    }
}

/// Results for a whole run, in input order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<BaseUrlReport>,
    pub failed: Vec<(String, CrawlError)>,
}

impl RunReport {
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.completed.iter().map(|r| r.records).sum()
    }

    #[must_use]
    pub fn total_pages_failed(&self) -> usize {
        self.completed.iter().map(|r| r.failed).sum()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Whether a location points at an image file.
#[must_use]
pub fn is_image_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url.to_ascii_lowercase(),
    };
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Crawls base URLs from robots.txt to CSV.
#[derive(Debug, Clone)]
pub struct CrawlPipeline {
    client: HttpClient,
    engine: Arc<FetchEngine>,
    policy: PolicyResolver,
    sitemaps: SitemapResolver,
    sink: CsvSink,
    respect_crawl_delay: bool,
}

impl CrawlPipeline {
    /// Assembles a pipeline around an existing client and engine.
    #[must_use]
    pub fn new(client: HttpClient, engine: Arc<FetchEngine>, config: &CrawlConfig) -> Self {
        Self {
            policy: PolicyResolver::new(client.clone()),
            sitemaps: SitemapResolver::new(client.clone(), config.sitemap),
            sink: CsvSink::new(&config.output_dir),
            respect_crawl_delay: config.respect_crawl_delay,
            client,
            engine,
        }
    }

    /// Builds the client and engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the HTTP client cannot be built and
    /// [`CrawlError::Engine`] for an out-of-range concurrency.
    pub fn from_config(config: &CrawlConfig) -> Result<Self, CrawlError> {
        let client = HttpClient::with_timeout(config.request_timeout).map_err(CrawlError::Client)?;
        let engine = FetchEngine::new(
            config.concurrency,
            RetryPolicy::new(config.retries, config.retry_delay),
            Arc::new(RateLimiter::new()),
        )?;
        Ok(Self::new(client, Arc::new(engine), config))
    }

    #[must_use]
    pub fn engine(&self) -> &FetchEngine {
        &self.engine
    }

    #[must_use]
    pub fn sink(&self) -> &CsvSink {
        &self.sink
    }

    /// Crawls every base URL concurrently.
    ///
    /// A failing base URL is logged and recorded; it never stops the others.
    #[instrument(skip(self, base_urls), fields(base_urls = base_urls.len()))]
    pub async fn run(&self, base_urls: &[String]) -> RunReport {
        let results = join_all(base_urls.iter().map(|url| self.process_base_url(url))).await;

        let mut report = RunReport::default();
        for (url, result) in base_urls.iter().zip(results) {
            match result {
                Ok(done) => report.completed.push(done),
                Err(e) => {
                    error!(base_url = %url, error = %e, "crawl failed for base URL");
                    report.failed.push((url.clone(), e));
                }
            }
        }
        report
    }

    /// Crawls one base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidBaseUrl`] for an unparsable URL and
    /// [`CrawlError::Sink`] if the CSV cannot be written. Fetch and parse
    /// problems are logged and never returned.
    #[instrument(skip(self), fields(base_url = %base_url))]
    pub async fn process_base_url(&self, base_url: &str) -> Result<BaseUrlReport, CrawlError> {
        let base = Url::parse(base_url).map_err(|source| CrawlError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        info!("processing base URL");

        let rules = self.policy.fetch_policy(&base).await;
        info!(
            crawl_delay = rules.crawl_delay(),
            sitemaps = ?rules.sitemaps(),
            "robots.txt policy"
        );

        let seeds = seed_urls(&base, &rules);
        let links = self.sitemaps.fetch_all_sitemaps(&seeds, &rules).await;

        let pages: Vec<String> = links
            .into_iter()
            .filter(|link| {
                let image = is_image_url(link);
                if image {
                    info!(url = %link, "skipping image URL");
                }
                !image
            })
            .collect();

        let mut report = BaseUrlReport::empty(base_url);
        if pages.is_empty() {
            warn!("no links found in sitemaps");
            return Ok(report);
        }
        report.pages_discovered = pages.len();
        info!(pages = pages.len(), "crawling pages");

        if self.respect_crawl_delay {
            if let Some(delay) = rules.crawl_delay_duration() {
                let host = extract_host(base.as_str());
                info!(host = %host, delay_ms = delay.as_millis(), "enforcing crawl delay");
                self.engine.rate_limiter().set_delay(&host, delay);
            }
        }

        let outcomes = self.engine.fetch_many(&self.client, pages).await;
        let records = collect_records(&outcomes, &mut report);

        report.records = records.len();
        report.output = self.sink.write(&base, &records)?;
        info!(
            fetched = report.fetched,
            failed = report.failed,
            records = report.records,
            "base URL complete"
        );
        Ok(report)
    }
}

fn collect_records(outcomes: &[FetchOutcome], report: &mut BaseUrlReport) -> Vec<ProductRecord> {
    let mut records = Vec::new();
    for outcome in outcomes {
        match outcome {
            FetchOutcome::Success { .. } => {
                report.fetched += 1;
                records.extend(extract(outcome));
            }
            FetchOutcome::Failure {
                url,
                error,
                attempts_exhausted,
            } => {
                report.failed += 1;
                error!(url = %url, error = %error, attempts_exhausted, "failed to crawl page");
            }
        }
    }
    records
}
