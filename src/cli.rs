//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::fetch::REQUEST_TIMEOUT;
use harvester_core::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_OUTPUT_DIR, DEFAULT_SITEMAP_DEPTH};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "crawler.log";

/// Crawl e-commerce sitemaps and export product data to CSV.
///
/// Harvester reads each site's robots.txt, walks its sitemaps, fetches every
/// allowed page and extracts the JSON-LD product data into one CSV per site.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Base URLs to crawl (e.g. https://shop.example.com)
    #[arg(value_name = "BASE_URLS")]
    pub urls: Vec<String>,

    /// Read base URLs from a file, one per line (# starts a comment)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent page fetches across all sites (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Attempts per page, including the first (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub retries: u8,

    /// Per-request timeout in seconds (1-600)
    #[arg(long, default_value_t = REQUEST_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Directory for the CSV files (created if missing)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Child-sitemap levels to follow below the seed sitemaps (0-5)
    #[arg(long, default_value_t = DEFAULT_SITEMAP_DEPTH as u8, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub sitemap_depth: u8,

    /// Skip page URLs listed in more than one sitemap
    #[arg(long)]
    pub dedupe: bool,

    /// Space requests to a host by its robots.txt Crawl-delay
    #[arg(long)]
    pub respect_crawl_delay: bool,

    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}
