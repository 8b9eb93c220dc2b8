//! Forecast types
//!
//! A forecast is a named prediction question. Its type decides which
//! estimate and resolution values are acceptable:
//! - `Probability`: values constrained to `[0, 1]`
//! - `Numeric`: any finite value

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Domain validation failures, raised before anything is written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("could not parse `{0}` as a number")]
    Malformed(String),

    #[error("`{0}` is not a finite number")]
    NonFinite(String),

    #[error("Probability estimates must be between 0 and 1 (between 0% and 100%), got {value}")]
    OutOfRange { value: f64 },

    #[error("forecast `{0}` is already resolved")]
    AlreadyResolved(String),

    #[error("shortname must not be empty")]
    EmptyShortname,

    #[error("unknown forecast type `{0}` (expected PROB or NUMERIC)")]
    UnknownType(String),
}

/// Canonical form of a user-supplied shortname.
///
/// Every command goes through this, so `" rain "` and `"rain"` name the same
/// forecast. Blank input is rejected.
pub fn normalize_shortname(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyShortname)
    } else {
        Ok(trimmed)
    }
}

/// The closed set of forecast types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastType {
    /// Probability of an event, constrained to `[0, 1]`
    #[serde(rename = "PROB")]
    Probability,
    /// Any finite quantity
    Numeric,
}

impl ForecastType {
    /// Get the string representation of the forecast type
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastType::Probability => "PROB",
            ForecastType::Numeric => "NUMERIC",
        }
    }

    /// Integer code stored in the `forecast_type` column
    pub fn code(&self) -> i64 {
        match self {
            ForecastType::Probability => 1,
            ForecastType::Numeric => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ForecastType::Probability),
            2 => Some(ForecastType::Numeric),
            _ => None,
        }
    }

    /// Get all forecast types
    pub fn all() -> &'static [ForecastType] {
        &[ForecastType::Probability, ForecastType::Numeric]
    }

    /// Check a parsed value against the rules of this type.
    pub fn check(&self, value: f64) -> Result<f64, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite(value.to_string()));
        }
        match self {
            ForecastType::Probability if !(0.0..=1.0).contains(&value) => {
                Err(ValidationError::OutOfRange { value })
            }
            _ => Ok(value),
        }
    }
}

impl FromStr for ForecastType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prob" | "probability" => Ok(ForecastType::Probability),
            "numeric" | "num" => Ok(ForecastType::Numeric),
            _ => Err(ValidationError::UnknownType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ForecastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named prediction question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Unique identifier chosen by the author
    pub shortname: String,
    pub description: String,
    /// Chat-platform id of the creating user
    pub author: String,
    pub forecast_type: ForecastType,
    /// Final outcome, `None` until resolved
    pub resolution: Option<f64>,
}

impl Forecast {
    pub fn new(
        shortname: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
        forecast_type: ForecastType,
    ) -> Self {
        Self {
            shortname: shortname.into(),
            description: description.into(),
            author: author.into(),
            forecast_type,
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
