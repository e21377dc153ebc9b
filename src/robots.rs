//! robots.txt fetching and parsing.
//!
//! Supports `User-agent`, `Allow`, `Disallow`, `Crawl-delay` and `Sitemap`.
//! Only the `User-agent: *` group contributes path rules and the crawl delay;
//! `Sitemap` lines apply wherever they appear.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::fetch::{FetchError, HttpClient};

/// Location of robots.txt relative to the site root.
pub const ROBOTS_PATH: &str = "/robots.txt";

/// Crawl rules for one site, immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyRules {
    allowed_paths: Vec<String>,
    disallowed_paths: Vec<String>,
    crawl_delay: f64,
    sitemaps: Vec<String>,
}

impl PolicyRules {
    /// Rules that allow everything and declare nothing.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Parses a robots.txt body.
    ///
    /// Directive names are matched case-insensitively. Blank lines and `#`
    /// comment lines are skipped; empty `Allow`/`Disallow` values are ignored.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut rules = Self::default();
        let mut user_agent: Option<&str> = None;

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let in_star_group = user_agent == Some("*");

            match name.trim().to_ascii_lowercase().as_str() {
                "user-agent" => user_agent = Some(value),
                "disallow" if in_star_group && !value.is_empty() => {
                    rules.disallowed_paths.push(value.to_string());
                }
                "allow" if in_star_group && !value.is_empty() => {
                    rules.allowed_paths.push(value.to_string());
                }
                "crawl-delay" if in_star_group => match value.parse::<f64>() {
                    Ok(delay) if delay.is_finite() && delay >= 0.0 => {
                        debug!(delay, "crawl delay declared");
                        rules.crawl_delay = delay;
                    }
                    _ => warn!(value = %value, "invalid crawl-delay value in robots.txt"),
                },
                "sitemap" if !value.is_empty() => {
                    debug!(sitemap = %value, "sitemap declared in robots.txt");
                    rules.sitemaps.push(value.to_string());
                }
                _ => {}
            }
        }

        rules
    }

    /// Path prefixes explicitly allowed for `*`.
    #[must_use]
    pub fn allowed_paths(&self) -> &[String] {
        &self.allowed_paths
    }

    /// Path prefixes disallowed for `*`.
    #[must_use]
    pub fn disallowed_paths(&self) -> &[String] {
        &self.disallowed_paths
    }

    /// Declared crawl delay in seconds (0 when absent).
    #[must_use]
    pub fn crawl_delay(&self) -> f64 {
        self.crawl_delay
    }

    /// Declared crawl delay, `None` when absent or zero.
    #[must_use]
    pub fn crawl_delay_duration(&self) -> Option<Duration> {
        (self.crawl_delay > 0.0).then(|| Duration::from_secs_f64(self.crawl_delay))
    }

    /// Sitemap URLs declared anywhere in the file.
    #[must_use]
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Finds the rule that decides `url`, if any.
    ///
    /// Disallow prefixes are checked first and the first match wins; allow
    /// prefixes are only consulted when no disallow prefix matched.
    #[must_use]
    pub fn matching_rule(&self, url: &str) -> Option<RuleMatch> {
        let path = path_of(url);
        let matches = |prefixes: &[String]| {
            prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        };

        if matches(&self.disallowed_paths) {
            Some(RuleMatch::Disallow)
        } else if matches(&self.allowed_paths) {
            Some(RuleMatch::Allow)
        } else {
            None
        }
    }

    /// Returns whether `url` may be crawled.
    ///
    /// Accepts an absolute URL or a bare path. Only a disallow match rejects;
    /// an allow match or no match at all permits the URL.
    #[must_use]
    pub fn is_allowed(&self, url: &str) -> bool {
        match self.matching_rule(url) {
            Some(RuleMatch::Disallow) => false,
            Some(RuleMatch::Allow) | None => true,
        }
    }
}

/// Which kind of robots.txt prefix matched a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    Disallow,
    Allow,
}

fn path_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}

/// Builds `{base}/robots.txt`.
///
/// # Errors
///
/// Returns a `url::ParseError` if the join fails (e.g. a `data:` base).
pub fn robots_url(base_url: &Url) -> Result<Url, url::ParseError> {
    base_url.join(ROBOTS_PATH)
}

/// Fetches and parses robots.txt for a base URL.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    client: HttpClient,
}

impl PolicyResolver {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetches `{base}/robots.txt` and parses it.
    ///
    /// Never fails: a missing file, non-200 status or transport error is logged
    /// and yields [`PolicyRules::unrestricted`].
    #[instrument(skip(self), fields(base_url = %base_url))]
    pub async fn fetch_policy(&self, base_url: &Url) -> PolicyRules {
        let robots = match robots_url(base_url) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "cannot build robots.txt URL");
                return PolicyRules::unrestricted();
            }
        };

        match self.client.get_text(robots.as_str()).await {
            Ok(body) => {
                info!(robots_url = %robots, "fetched robots.txt");
                let rules = PolicyRules::parse(&body);
                if rules.crawl_delay > 0.0 {
                    info!(crawl_delay = rules.crawl_delay, "robots.txt declares crawl delay");
                }
                for sitemap in &rules.sitemaps {
                    info!(sitemap = %sitemap, "found sitemap in robots.txt");
                }
                rules
            }
            Err(FetchError::HttpStatus { status, .. }) => {
                warn!(robots_url = %robots, status, "robots.txt not available");
                PolicyRules::unrestricted()
            }
            Err(e) => {
                error!(robots_url = %robots, error = %e, "error fetching robots.txt");
                PolicyRules::unrestricted()
            }
        }
    }
}
