//! Repair and coercion helpers for analyzer output
//!
//! The statement analyzer serializes pandas frames and occasionally emits tokens
//! that are not JSON (`NaN`, `undefined`, `Infinity`, `-Infinity`). These helpers
//! turn such payloads into valid JSON and normalize the numeric fields of
//! transaction rows before anything downstream looks at them.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Replace non-JSON numeric tokens that appear as values (after a colon) with `null`
pub fn sanitize_json_string(raw: &str) -> String {
    let re = Regex::new(r":(\s*)(?:-?Infinity|NaN|undefined)\b").expect("valid regex");
    re.replace_all(raw, ":${1}null").into_owned()
}

/// Sanitize then parse an analyzer payload
///
/// Fails with `MalformedResponse` when the payload is empty or still not valid JSON
/// after repair.
pub fn parse_sanitized(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(Error::MalformedResponse("empty payload".into()));
    }

    let repaired = sanitize_json_string(raw);
    serde_json::from_str(&repaired).map_err(|e| {
        let truncated = if repaired.len() > 200 {
            let mut end = 200;
            while !repaired.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &repaired[..end])
        } else {
            repaired.clone()
        };
        Error::MalformedResponse(format!("{} | Raw: {}", e, truncated))
    })
}

/// Strict finite-number check: only JSON numbers qualify, strings never do
pub fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// Lenient coercion: JSON numbers, or strings holding a number (thousands separators allowed)
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Normalize the numeric fields of one raw transaction row in place
///
/// `Credit`/`Debit` become a finite number or `null` (strings are not amounts).
/// `Balance` is coerced leniently and becomes `null` when unusable.
pub fn normalize_numeric_fields(row: &mut Map<String, Value>) {
    for key in ["Credit", "Debit"] {
        let normalized = finite_number(row.get(key))
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        row.insert(key.to_string(), normalized);
    }

    let balance = row
        .get("Balance")
        .and_then(coerce_f64)
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null);
    row.insert("Balance".to_string(), balance);
}

/// Pre-filter: a row is ingestable only if Credit or Debit is a finite number
pub fn has_amount(row: &Map<String, Value>) -> bool {
    finite_number(row.get("Credit")).is_some() || finite_number(row.get("Debit")).is_some()
}
