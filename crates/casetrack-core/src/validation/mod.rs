//! Validation modules
//!
//! Value parsing for loosely typed case input, and the MIME and filename
//! rules applied to uploads.

mod upload;

pub use upload::{is_allowed_mime, normalize_mime_type, sanitize_base_name, storage_filename};

use chrono::{NaiveDate, NaiveTime};

use crate::error::{AppError, AppResult};
use crate::models::NumericInput;

/// Returns the trimmed value, or a `Validation` error naming `field` when
/// it is absent or blank.
pub fn non_blank(field: &str, value: Option<String>) -> AppResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(AppError::InvalidInput(format!("{} must not be empty", field))),
        None => Err(AppError::Validation {
            fields: vec![field.to_string()],
        }),
    }
}

/// Integral floats inside the `i64` range. `i64::MAX as f64` rounds up to
/// 2^63, so the upper bound is exclusive.
fn whole_number(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64)
        .then_some(n as i64)
}

/// Parses a whole number. Blank text yields `Ok(None)`.
pub fn parse_integer(field: &str, value: &NumericInput) -> AppResult<Option<i64>> {
    let invalid = || AppError::InvalidInput(format!("{} must be a whole number", field));
    match value {
        NumericInput::Integer(n) => Ok(Some(*n)),
        NumericInput::Number(n) => whole_number(*n).map(Some).ok_or_else(invalid),
        NumericInput::Text(t) => {
            let t = t.trim();
            if t.is_empty() {
                return Ok(None);
            }
            if let Ok(n) = t.parse::<i64>() {
                return Ok(Some(n));
            }
            t.parse::<f64>()
                .ok()
                .and_then(whole_number)
                .map(Some)
                .ok_or_else(invalid)
        }
    }
}

/// Parses a finite decimal number. Blank text yields `Ok(None)`.
pub fn parse_float(field: &str, value: &NumericInput) -> AppResult<Option<f64>> {
    let invalid = || AppError::InvalidInput(format!("{} must be a number", field));
    match value {
        NumericInput::Integer(n) => Ok(Some(*n as f64)),
        NumericInput::Number(n) if n.is_finite() => Ok(Some(*n)),
        NumericInput::Number(_) => Err(invalid()),
        NumericInput::Text(t) => {
            let t = t.trim();
            if t.is_empty() {
                return Ok(None);
            }
            match t.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(invalid()),
            }
        }
    }
}

/// `YYYY-MM-DD`
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::InvalidInput(format!("date must be formatted YYYY-MM-DD (got '{}')", value))
    })
}

/// `HH:MM`, with optional seconds.
pub fn parse_hour(value: &str) -> AppResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::InvalidInput(format!("hour must be formatted HH:MM (got '{}')", value)))
}
