//! Sitemap discovery and resolution.
//!
//! Starting from the seed sitemaps (declared in robots.txt, or the two
//! conventional fallback paths), the resolver fetches each document, keeps
//! the locations robots.txt allows, follows child sitemaps up to a configured
//! depth and returns the page URLs it found.
//!
//! A location is treated as a child sitemap when it contains `sitemap`
//! (case-insensitive); anything else is a page. Locations found at the
//! deepest level are always pages.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::fetch::HttpClient;
//! use harvester_core::robots::PolicyRules;
//! use harvester_core::sitemap::{SitemapOptions, SitemapResolver};
//!
//! # async fn example() {
//! let resolver = SitemapResolver::new(HttpClient::new(), SitemapOptions::default());
//! let seeds = vec!["https://shop.example.com/sitemap.xml".to_string()];
//! let pages = resolver
//!     .fetch_all_sitemaps(&seeds, &PolicyRules::unrestricted())
//!     .await;
//! println!("{} pages", pages.len());
//! # }
//! ```

mod parser;

use std::collections::HashSet;

use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::fetch::{FetchError, HttpClient};
use crate::robots::PolicyRules;

pub use parser::{SitemapError, SitemapNode, parse_sitemap};

/// Paths tried when robots.txt declares no sitemap.
pub const FALLBACK_SITEMAP_PATHS: [&str; 2] = ["/sitemap.xml", "/sitemap_index.xml"];

/// Child-sitemap hops followed below the seeds by default.
pub const DEFAULT_SITEMAP_DEPTH: usize = 1;

/// Deepest child-sitemap nesting accepted from configuration.
pub const MAX_SITEMAP_DEPTH: usize = 5;

/// How far and how strictly sitemaps are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitemapOptions {
    /// Child-sitemap hops below the seeds (0 = seeds only).
    pub max_depth: usize,
    /// Drop page URLs already returned earlier in the same resolution.
    pub dedupe_pages: bool,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SITEMAP_DEPTH,
            dedupe_pages: false,
        }
    }
}

/// Seed sitemap URLs for a site: those declared in robots.txt, otherwise
/// `{base}/sitemap.xml` and `{base}/sitemap_index.xml`.
#[must_use]
pub fn seed_urls(base_url: &Url, rules: &PolicyRules) -> Vec<String> {
    if !rules.sitemaps().is_empty() {
        return rules.sitemaps().to_vec();
    }
    FALLBACK_SITEMAP_PATHS
        .iter()
        .filter_map(|path| base_url.join(path).ok())
        .map(String::from)
        .collect()
}

/// Whether a location points at another sitemap rather than a page.
#[must_use]
pub fn is_child_sitemap(url: &str) -> bool {
    url.to_lowercase().contains("sitemap")
}

/// Fetches and flattens sitemap trees.
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    client: HttpClient,
    options: SitemapOptions,
}

impl SitemapResolver {
    #[must_use]
    pub fn new(client: HttpClient, options: SitemapOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn options(&self) -> SitemapOptions {
        self.options
    }

    /// Resolves every seed into a flat list of allowed page URLs.
    ///
    /// Pages come back in discovery order: a document's own pages first, then
    /// the pages of its children, then the next seed. Each sitemap URL is
    /// fetched at most once, so reference cycles terminate. Unreachable or
    /// malformed documents contribute nothing and are logged.
    #[instrument(skip(self, seeds, rules), fields(seeds = seeds.len(), max_depth = self.options.max_depth))]
    pub async fn fetch_all_sitemaps(&self, seeds: &[String], rules: &PolicyRules) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_pages: HashSet<String> = HashSet::new();
        let mut pages = Vec::new();

        let mut stack: Vec<(String, usize)> = seeds.iter().rev().map(|s| (s.clone(), 0)).collect();

        while let Some((sitemap_url, depth)) = stack.pop() {
            if !visited.insert(sitemap_url.clone()) {
                debug!(sitemap = %sitemap_url, "sitemap already resolved, skipping");
                continue;
            }

            let Some(content) = self.fetch_sitemap(&sitemap_url).await else {
                continue;
            };

            let mut children = Vec::new();
            for loc in extract_links(&content, rules) {
                if depth < self.options.max_depth && is_child_sitemap(&loc) {
                    children.push(loc);
                } else if !self.options.dedupe_pages || seen_pages.insert(loc.clone()) {
                    pages.push(loc);
                }
            }

            debug!(
                sitemap = %sitemap_url,
                depth,
                children = children.len(),
                "queued child sitemaps"
            );
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        info!(pages = pages.len(), sitemaps = visited.len(), "resolved sitemaps");
        pages
    }

    /// Fetches one sitemap body; `None` on any failure or an empty body.
    async fn fetch_sitemap(&self, sitemap_url: &str) -> Option<String> {
        match self.client.get_text(sitemap_url).await {
            Ok(body) if body.trim().is_empty() => {
                warn!(sitemap = %sitemap_url, "sitemap body is empty");
                None
            }
            Ok(body) => {
                info!(sitemap = %sitemap_url, "fetched sitemap");
                Some(body)
            }
            Err(FetchError::HttpStatus { status, .. }) => {
                warn!(sitemap = %sitemap_url, status, "failed to fetch sitemap");
                None
            }
            Err(e) => {
                error!(sitemap = %sitemap_url, error = %e, "error fetching sitemap");
                None
            }
        }
    }
}

/// Parses a sitemap body and keeps the locations robots.txt allows.
///
/// Parse failures are logged and yield an empty list.
#[must_use]
pub fn extract_links(content: &str, rules: &PolicyRules) -> Vec<String> {
    let node = match parse_sitemap(content) {
        Ok(node) => node,
        Err(SitemapError::UnsupportedRoot(root)) => {
            warn!(root = %root, "document is not a sitemap");
            return Vec::new();
        }
        Err(e) => {
            error!(error = %e, "error parsing sitemap XML");
            return Vec::new();
        }
    };

    let links: Vec<String> = node
        .into_locs()
        .into_iter()
        .filter(|loc| {
            let allowed = rules.is_allowed(loc);
            if !allowed {
                debug!(url = %loc, "robots.txt disallows sitemap entry");
            }
            allowed
        })
        .collect();

    debug!(links = links.len(), "extracted links from sitemap");
    links
}
