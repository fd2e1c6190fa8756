#![forbid(unsafe_code)]

//! Canonicalizing value converters.
//!
//! A [`Normalizer`] turns a raw stored/assigned representation into the
//! canonical comparable form, so two renderings of the same logical value
//! (say, an RFC 3339 string and a parsed timestamp) diff as equal. Fields
//! default to [`identity`]; attach a converter with
//! [`FieldDescriptor::with_normalizer`](crate::FieldDescriptor::with_normalizer).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::value::Value;

/// Converts a raw value into its canonical comparable form.
pub type Normalizer = fn(Value) -> Result<Value, NormalizeError>;

/// Failure from a [`Normalizer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NormalizeError {
    message: String,
}

impl NormalizeError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The default normalizer: passes the raw value through untouched.
pub fn identity(raw: Value) -> Result<Value, NormalizeError> {
    Ok(raw)
}

/// Canonicalize timestamps: RFC 3339 text parses into [`Value::Timestamp`],
/// timestamps and null pass through.
pub fn datetime(raw: Value) -> Result<Value, NormalizeError> {
    match raw {
        Value::Null | Value::Timestamp(_) => Ok(raw),
        Value::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|parsed| Value::Timestamp(parsed.with_timezone(&Utc)))
            .map_err(|err| NormalizeError::new(format!("invalid timestamp text {s:?}: {err}"))),
        other => Err(NormalizeError::new(format!(
            "cannot normalize {} into a timestamp",
            other.kind_name()
        ))),
    }
}

/// Canonicalize integers: numeric text parses into [`Value::Int`], integral
/// floats convert, integers and null pass through.
pub fn integer(raw: Value) -> Result<Value, NormalizeError> {
    match raw {
        Value::Null | Value::Int(_) => Ok(raw),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| NormalizeError::new(format!("invalid integer text {s:?}: {err}"))),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) => {
            Ok(Value::Int(f as i64))
        }
        other => Err(NormalizeError::new(format!(
            "cannot normalize {} into an integer",
            other.kind_name()
        ))),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
