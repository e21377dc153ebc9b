//! CSV output for extracted product records.
//!
//! One file per base URL, named after its host:
//! `https://shop.example.com` → `{output_dir}/shop_example_com_products.csv`.
//! The header row comes from the [`ProductRecord`] field names.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extract::ProductRecord;

/// Default directory for CSV files, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "extracted_links";

/// Suffix appended to the normalized host.
pub const OUTPUT_FILE_SUFFIX: &str = "_products.csv";

/// Errors from writing CSV output.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output directory or file could not be created.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("failed to write CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Builds the CSV file name for a base URL.
///
/// Dots and port separators in the host become underscores. A URL without a
/// host falls back to `unknown`.
#[must_use]
pub fn output_file_name(base_url: &Url) -> String {
    let host = match (base_url.host_str(), base_url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => "unknown".to_string(),
    };
    format!("{}{OUTPUT_FILE_SUFFIX}", host.replace(['.', ':'], "_"))
}

/// Writes product records as CSV files into one directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory (and parents) if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the directory cannot be created.
    pub fn ensure_output_dir(&self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| SinkError::Io {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Writes `records` to the file for `base_url`, replacing any previous file.
    ///
    /// Returns the written path, or `None` when there is nothing to write (no
    /// file is created in that case).
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the directory or file cannot be written.
    #[instrument(skip(self, records), fields(base_url = %base_url, records = records.len()))]
    pub fn write(
        &self,
        base_url: &Url,
        records: &[ProductRecord],
    ) -> Result<Option<PathBuf>, SinkError> {
        if records.is_empty() {
            warn!("no product data extracted, CSV not written");
            return Ok(None);
        }

        self.ensure_output_dir()?;
        let path = self.output_dir.join(output_file_name(base_url));
        debug!(path = %path.display(), "writing CSV");

        let csv_err = |source| SinkError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        for record in records {
            writer.serialize(record).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "product info saved");
        Ok(Some(path))
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}
