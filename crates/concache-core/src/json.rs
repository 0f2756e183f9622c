//! JSON helpers that keep "no value" distinct from JSON `null`.
//!
//! The key-value store can only hold strings, and JSON has no literal for an
//! absent value, so an absent value is written as the bare sentinel
//! `undefined`. `Some(null)` and `None` therefore survive a round trip as
//! different values.

use serde::{de::DeserializeOwned, Serialize};

/// Sentinel written for an absent value.
pub const UNDEFINED: &str = "undefined";

/// Serialize `value`, writing [`UNDEFINED`] for `None`.
pub fn stringify_json_safe<T: Serialize + ?Sized>(value: Option<&T>) -> serde_json::Result<String> {
    match value {
        Some(value) => serde_json::to_string(value),
        None => Ok(UNDEFINED.to_string()),
    }
}

/// Parse `text`, returning `None` for the [`UNDEFINED`] sentinel.
pub fn parse_json_safe<T: DeserializeOwned>(text: &str) -> serde_json::Result<Option<T>> {
    if text == UNDEFINED {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some)
}
