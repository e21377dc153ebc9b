//! JSON-LD document shapes.
//!
//! A structured-data block is either a single entity or a list of entities.
//! Each entity is classified once into [`JsonLdEntity`]; anything that is not
//! an object where an entity is expected is a structural error.

use serde_json::{Map, Value};

use super::ExtractError;

/// `@type` value identifying a product entity.
pub const PRODUCT_TYPE: &str = "Product";

/// One JSON-LD entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonLdEntity<'a> {
    /// An object whose `@type` is exactly `"Product"`.
    Product(&'a Map<String, Value>),
    /// Any other object.
    Other,
}

impl<'a> JsonLdEntity<'a> {
    /// Classifies a value that should be an entity object.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Structure`] if the value is not an object.
    pub fn classify(value: &'a Value) -> Result<Self, ExtractError> {
        let Value::Object(map) = value else {
            return Err(ExtractError::structure(format!(
                "expected a JSON-LD object, found {}",
                kind_of(value)
            )));
        };
        match map.get("@type") {
            Some(Value::String(t)) if t == PRODUCT_TYPE => Ok(Self::Product(map)),
            _ => Ok(Self::Other),
        }
    }
}

/// Finds the first product entity in a parsed JSON-LD document.
///
/// Lists are scanned in order and the scan stops at the first product, so a
/// malformed member after it is never inspected.
///
/// # Errors
///
/// Returns [`ExtractError::Structure`] for a scalar document or a non-object
/// list member reached before any product.
pub fn select_product(document: &Value) -> Result<Option<&Map<String, Value>>, ExtractError> {
    match document {
        Value::Array(items) => {
            for item in items {
                if let JsonLdEntity::Product(map) = JsonLdEntity::classify(item)? {
                    return Ok(Some(map));
                }
            }
            Ok(None)
        }
        other => match JsonLdEntity::classify(other)? {
            JsonLdEntity::Product(map) => Ok(Some(map)),
            JsonLdEntity::Other => Ok(None),
        },
    }
}

/// Reads a text property, `None` when absent, null, empty or blank.
///
/// # Errors
///
/// Returns [`ExtractError::Structure`] when the property is present with a
/// non-string type (numbers too, unless `allow_number`).
pub fn text_property(
    map: &Map<String, Value>,
    key: &str,
    allow_number: bool,
) -> Result<Option<String>, ExtractError> {
    let text = match map.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) if allow_number => n.to_string(),
        Some(other) => {
            return Err(ExtractError::structure(format!(
                "property `{key}` is {}, expected a string",
                kind_of(other)
            )));
        }
    };
    Ok((!text.is_empty()).then_some(text))
}

/// Returns the offer object of a product, if any.
///
/// `offers` may be a single object or a list whose first element is used.
///
/// # Errors
///
/// Returns [`ExtractError::Structure`] when `offers` (or its first element)
/// is not an object.
pub fn first_offer(product: &Map<String, Value>) -> Result<Option<&Map<String, Value>>, ExtractError> {
    let offer = match product.get("offers") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(list)) => match list.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        Some(other) => other,
    };
    match offer {
        Value::Object(map) => Ok(Some(map)),
        other => Err(ExtractError::structure(format!(
            "`offers` is {}, expected an object",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
