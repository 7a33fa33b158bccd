//! Null-preserving numeric coercion for raw telemetry values.
//!
//! Absent and `null` values stay `None`. Anything else must convert cleanly:
//! numbers pass, numeric strings are parsed, booleans become 0/1 and floats
//! truncate toward zero when an integer is wanted.

use serde_json::Value;

use crate::error::CoerceError;

fn malformed(field: &'static str, expected: &'static str, value: &Value) -> CoerceError {
    CoerceError {
        field,
        expected,
        value: value.to_string(),
    }
}

pub fn to_f64(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, CoerceError> {
    let v = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(malformed(field, "a finite number", v)),
    }
}

pub fn to_i64(field: &'static str, value: Option<&Value>) -> Result<Option<i64>, CoerceError> {
    let v = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let parsed = match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| malformed(field, "an integer", v))
}

/// Like [`to_f64`], but a missing value is an error.
pub fn require_f64(field: &'static str, value: &Value) -> Result<f64, CoerceError> {
    to_f64(field, Some(value))?.ok_or_else(|| malformed(field, "a finite number", value))
}

/// Like [`to_i64`], but a missing value is an error.
pub fn require_i64(field: &'static str, value: &Value) -> Result<i64, CoerceError> {
    to_i64(field, Some(value))?.ok_or_else(|| malformed(field, "an integer", value))
}
