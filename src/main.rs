//! CLI entry point for the sitemap harvester.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{CrawlConfig, CrawlPipeline, SitemapOptions};
use tracing::{debug, info, warn};

mod cli;
mod logging;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let _log_guard = logging::init(&args.log_file, args.verbose, args.quiet)?;

    debug!(?args, "CLI arguments parsed");
    info!("Harvester starting");

    let base_urls = collect_base_urls(&args)?;
    if base_urls.is_empty() {
        info!("No base URLs provided. Pass them as arguments, with --input, or via stdin.");
        info!("Example: harvester https://shop.example.com");
        return Ok(());
    }
    info!(base_urls = base_urls.len(), "Starting crawl");

    let config = CrawlConfig {
        concurrency: usize::from(args.concurrency),
        retries: u32::from(args.retries),
        request_timeout: Duration::from_secs(args.timeout),
        sitemap: SitemapOptions {
            max_depth: usize::from(args.sitemap_depth),
            dedupe_pages: args.dedupe,
        },
        respect_crawl_delay: args.respect_crawl_delay,
        output_dir: args.output_dir.clone(),
        ..CrawlConfig::default()
    };

    let pipeline = CrawlPipeline::from_config(&config)?;
    pipeline.sink().ensure_output_dir()?;

    let report = pipeline.run(&base_urls).await;

    for site in &report.completed {
        match &site.output {
            Some(path) => info!(
                base_url = %site.base_url,
                records = site.records,
                failed_pages = site.failed,
                path = %path.display(),
                "Site complete"
            ),
            None => warn!(base_url = %site.base_url, "Site produced no CSV"),
        }
    }
    for (url, error) in &report.failed {
        warn!(base_url = %url, error = %error, "Site failed");
    }

    let stats = pipeline.engine().stats();
    info!(
        sites = report.completed.len(),
        failed_sites = report.failed.len(),
        records = report.total_records(),
        pages_fetched = stats.succeeded(),
        pages_failed = stats.failed(),
        retried = stats.retried(),
        "Crawl complete"
    );

    Ok(())
}

/// Gathers base URLs from arguments, the input file, then stdin.
fn collect_base_urls(args: &Args) -> Result<Vec<String>> {
    let mut urls: Vec<String> = args.urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(path) = &args.input {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?;
        urls.extend(parse_url_list(&text));
    }

    if urls.is_empty() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        urls.extend(parse_url_list(&buffer));
    }

    urls.retain(|u| !u.is_empty());
    Ok(urls)
}

/// One URL per line; blank lines and `#` comments are skipped.
fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
