//! Field validation for weather record payloads
//!
//! Create and update payloads arrive as raw JSON objects so malformed values
//! can be reported gracefully instead of failing at deserialization. The
//! helpers here check field presence, enforce the allow-list for partial
//! updates, and convert values into their storage types.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Fields a client supplies on create and may overwrite on update
pub const MUTABLE_FIELDS: [&str; 4] = ["city", "temperature", "humidity", "description"];

/// Maximum stored length of the city field
pub const CITY_MAX_LEN: usize = 100;

/// Maximum stored length of the description field
pub const DESCRIPTION_MAX_LEN: usize = 255;

/// Temperature and humidity are NUMERIC(5,2): two decimal places
const DECIMAL_SCALE: u32 = 2;

/// Required creation fields missing from the payload, in schema order.
pub fn missing_required_fields(fields: &Map<String, Value>) -> Vec<String> {
    MUTABLE_FIELDS
        .iter()
        .filter(|name| !fields.contains_key(**name))
        .map(|name| (*name).to_string())
        .collect()
}

/// First key of an update payload that does not name a mutable field.
///
/// Iterates the payload in the order its keys were supplied, so the reported
/// key is deterministic when several are invalid.
pub fn first_unknown_field(fields: &Map<String, Value>) -> Option<&str> {
    fields
        .keys()
        .map(String::as_str)
        .find(|key| !MUTABLE_FIELDS.contains(key))
}

/// Look up a field that must be present in a creation payload.
pub fn required_value<'a>(fields: &'a Map<String, Value>, field: &str) -> StoreResult<&'a Value> {
    fields.get(field).ok_or_else(|| invalid(field, "is required"))
}

/// Convert a JSON value into a required, bounded text field.
pub fn required_text(field: &str, value: &Value, max_len: usize) -> StoreResult<String> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(field, "must be a string"))?;
    if text.trim().is_empty() {
        return Err(invalid(field, "cannot be empty"));
    }
    if text.chars().count() > max_len {
        return Err(invalid(field, &format!("cannot exceed {} characters", max_len)));
    }
    Ok(text.to_string())
}

/// Convert a JSON value into a fixed-point decimal with two places.
///
/// Accepts JSON numbers and numeric strings (clients send values like
/// "40.6"); anything else is rejected rather than coerced.
pub fn fixed_decimal(field: &str, value: &Value) -> StoreResult<Decimal> {
    let parsed = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    let parsed = parsed.ok_or_else(|| invalid(field, "must be a number"))?;
    let rounded = parsed.round_dp(DECIMAL_SCALE);
    if rounded.abs() >= Decimal::from(1000) {
        return Err(invalid(field, "must be less than 1000 in magnitude"));
    }
    Ok(rounded)
}

fn invalid(field: &str, message: &str) -> StoreError {
    StoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
