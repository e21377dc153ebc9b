//! Tracing setup: console output plus a plain-text log file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Picks the default filter directive.
///
/// `RUST_LOG` still wins when set; see [`init`].
#[must_use]
pub fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the program exits.
///
/// # Errors
///
/// Fails if the log file's directory cannot be created or a subscriber is
/// already installed.
pub fn init(log_file: &Path, verbose: u8, quiet: bool) -> Result<WorkerGuard> {
    let level = default_level(verbose, quiet);
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (dir, file_name) = split_log_path(log_file)?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter());

    let console_layer = fmt::layer().with_target(false).with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

fn split_log_path(log_file: &Path) -> Result<(PathBuf, &std::ffi::OsStr)> {
    let file_name = log_file
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", log_file.display()))?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_priority() {
        assert_eq!(default_level(0, false), "info");
        assert_eq!(default_level(1, false), "debug");
        assert_eq!(default_level(3, false), "trace");
        assert_eq!(default_level(2, true), "error");
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("crawler.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "crawler.log");

        let (dir, name) = split_log_path(Path::new("logs/run/crawler.log")).unwrap();
        assert_eq!(dir, PathBuf::from("logs/run"));
        assert_eq!(name, "crawler.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }
}
