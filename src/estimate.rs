//! Estimates and the validation applied before one is written

use crate::forecast::{Forecast, ValidationError};
use serde::{Deserialize, Serialize};

/// One user's numeric guess toward a forecast's resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub shortname: String,
    pub author: String,
    /// Submission time, seconds since the Unix epoch
    pub time: i64,
    pub estimate: f64,
}

/// Parse user input into a finite number.
///
/// A trailing `%` divides the numeric prefix by 100, so `"37%"` becomes `0.37`.
pub fn parse_value(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    let (number, percent) = match trimmed.strip_suffix('%') {
        Some(prefix) => (prefix.trim_end(), true),
        None => (trimmed, false),
    };

    let parsed: f64 = number
        .parse()
        .map_err(|_| ValidationError::Malformed(raw.to_string()))?;
    let value = if percent { parsed / 100.0 } else { parsed };

    if !value.is_finite() {
        return Err(ValidationError::NonFinite(raw.to_string()));
    }
    Ok(value)
}

/// Validate an estimate against its forecast and return the value to store.
pub fn validate_estimate(forecast: &Forecast, raw: &str) -> Result<f64, ValidationError> {
    let value = parse_value(raw)?;
    if forecast.is_resolved() {
        return Err(ValidationError::AlreadyResolved(forecast.shortname.clone()));
    }
    forecast.forecast_type.check(value)
}

/// Validate a resolution value against its forecast.
///
/// Resolving an already-resolved forecast is allowed and overwrites the value.
pub fn validate_resolution(forecast: &Forecast, raw: &str) -> Result<f64, ValidationError> {
    let value = parse_value(raw)?;
    forecast.forecast_type.check(value)
}
