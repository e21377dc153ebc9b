//! Sitemap Harvester Core Library
//!
//! This library crawls e-commerce sites through their sitemaps and collects
//! the product data each page publishes as JSON-LD structured data.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`robots`] - robots.txt fetching and path policy
//! - [`sitemap`] - Sitemap discovery, parsing and recursive resolution
//! - [`fetch`] - HTTP client and concurrent fetch engine with retry
//! - [`extract`] - JSON-LD product extraction
//! - [`sink`] - CSV output
//! - [`pipeline`] - Per-site orchestration tying the stages together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod robots;
pub mod sink;
pub mod sitemap;
mod user_agent;

// Re-export commonly used types
pub use extract::{ExtractError, NOT_AVAILABLE, ProductRecord, extract, extract_product};
pub use fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, EngineError, FetchEngine, FetchError, FetchOutcome,
    FetchStats, HttpClient, RateLimiter, RetryDecision, RetryPolicy,
};
pub use pipeline::{BaseUrlReport, CrawlConfig, CrawlError, CrawlPipeline, RunReport};
pub use robots::{PolicyResolver, PolicyRules, RuleMatch};
pub use sink::{CsvSink, DEFAULT_OUTPUT_DIR, SinkError};
pub use sitemap::{
    DEFAULT_SITEMAP_DEPTH, MAX_SITEMAP_DEPTH, SitemapError, SitemapNode, SitemapOptions,
    SitemapResolver,
};
pub use user_agent::BROWSER_USER_AGENT;
