//! Product extraction from fetched HTML.
//!
//! Reads the first `<script type="application/ld+json">` block of a page and
//! turns its `Product` entity into a [`ProductRecord`].
//!
//! Two kinds of "nothing found" are kept apart:
//! - the page has no block, broken JSON, or no product: a placeholder record
//!   with every field `"N/A"` is returned
//! - the product exists but has an unexpected shape: no record at all

mod jsonld;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::fetch::FetchOutcome;

pub use jsonld::{JsonLdEntity, PRODUCT_TYPE, select_product};

/// Sentinel for a missing field.
pub const NOT_AVAILABLE: &str = "N/A";

static LD_JSON_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).ok());

/// One product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    pub price: String,
    pub description: String,
    pub url: String,
}

impl ProductRecord {
    /// The all-"N/A" record used when a page carries no product data.
    #[must_use]
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self {
            title: NOT_AVAILABLE.to_string(),
            price: NOT_AVAILABLE.to_string(),
            description: NOT_AVAILABLE.to_string(),
            url: url.into(),
        }
    }

    /// Whether every data field is the sentinel.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.title == NOT_AVAILABLE
            && self.price == NOT_AVAILABLE
            && self.description == NOT_AVAILABLE
    }
}

/// Errors from interpreting structured data.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The JSON-LD parsed, but not into the shape a product should have.
    #[error("unexpected structured data shape: {reason}")]
    Structure {
        /// What was wrong.
        reason: String,
    },
}

impl ExtractError {
    pub(crate) fn structure(reason: impl Into<String>) -> Self {
        Self::Structure {
            reason: reason.into(),
        }
    }
}

/// Extracts a product record from a fetch outcome.
///
/// Failures yield `None`; they are reported by the engine, not here.
#[must_use]
pub fn extract(outcome: &FetchOutcome) -> Option<ProductRecord> {
    match outcome {
        FetchOutcome::Success { url, body, .. } => extract_product(url, body),
        FetchOutcome::Failure { url, .. } => {
            debug!(url = %url, "skipping extraction for failed fetch");
            None
        }
    }
}

/// Extracts a product record from a page body.
///
/// Returns a placeholder when the page has no usable product data and `None`
/// when the data is structurally broken.
#[must_use]
pub fn extract_product(url: &str, html: &str) -> Option<ProductRecord> {
    match try_extract(url, html) {
        Ok(record) => Some(record),
        Err(e) => {
            error!(url = %url, error = %e, "error extracting product info");
            None
        }
    }
}

fn try_extract(url: &str, html: &str) -> Result<ProductRecord, ExtractError> {
    let Some(block) = first_ld_json_block(html) else {
        warn!(url = %url, "no structured data found");
        return Ok(ProductRecord::placeholder(url));
    };

    let document: serde_json::Value = match serde_json::from_str(&block) {
        Ok(value) => value,
        Err(e) => {
            error!(url = %url, error = %e, "JSON decoding failed");
            return Ok(ProductRecord::placeholder(url));
        }
    };

    let Some(product) = select_product(&document)? else {
        warn!(url = %url, "no Product type structured data found");
        return Ok(ProductRecord::placeholder(url));
    };

    let title = jsonld::text_property(product, "name", false)?;
    let description = jsonld::text_property(product, "description", false)?;
    let price = match jsonld::first_offer(product)? {
        Some(offer) => {
            let amount = jsonld::text_property(offer, "price", true)?;
            let currency = jsonld::text_property(offer, "priceCurrency", false)?;
            format_price(amount, currency)
        }
        None => None,
    };

    Ok(ProductRecord {
        title: or_not_available(title),
        price: or_not_available(price),
        description: or_not_available(description),
        url: url.to_string(),
    })
}

/// Returns the text of the first JSON-LD script block.
fn first_ld_json_block(html: &str) -> Option<String> {
    let selector = LD_JSON_SELECTOR.as_ref()?;
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|script| script.text().collect::<String>())
}

fn format_price(amount: Option<String>, currency: Option<String>) -> Option<String> {
    match (amount, currency) {
        (Some(amount), Some(currency)) if amount != NOT_AVAILABLE && currency != NOT_AVAILABLE => {
            Some(format!("{amount} {currency}"))
        }
        _ => None,
    }
}

fn or_not_available(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
