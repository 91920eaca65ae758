//! JSON decoding of framed response payloads.

use serde_json::{Map, Value};

use crate::{AppError, Result};

/// Decode an accumulated payload.
///
/// An empty payload decodes to an empty JSON object rather than an error.
///
/// # Errors
///
/// Returns [`AppError::Decode`] with the parser diagnostic and the raw
/// payload when the text is not valid JSON.
pub fn decode_response(payload: &str) -> Result<Value> {
    if payload.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str(payload).map_err(|e| AppError::Decode {
        message: e.to_string(),
        raw: payload.to_owned(),
    })
}

/// Unwrap a query response: the decoded mapping carries exactly one entry
/// keyed by the device or service name, and callers want its value.
///
/// An empty mapping (empty payload) is returned unchanged.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] when `value` is not an object or holds more
/// than one entry.
pub fn unwrap_single_entry(value: Value) -> Result<Value> {
    let Value::Object(map) = value else {
        return Err(AppError::Protocol(format!(
            "query response is not a JSON object: {value}"
        )));
    };

    if map.len() > 1 {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        return Err(AppError::Protocol(format!(
            "query response has {} top-level entries, expected one: {keys:?}",
            map.len()
        )));
    }

    match map.into_iter().next() {
        Some((_, inner)) => Ok(inner),
        None => Ok(Value::Object(Map::new())),
    }
}
