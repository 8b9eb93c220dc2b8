//! # Forecaster - lightweight tracking of community forecasts
//!
//! Members of a chat community register forecasts, submit numeric estimates
//! against them and later resolve them with an outcome.
//!
//! Forecaster provides:
//! - Domain types for forecasts and estimates with per-type validation
//! - SQLite-backed persistence with one short-lived connection per operation
//! - A command layer that maps user commands onto the store and renders replies

pub mod forecast;
pub mod estimate;
pub mod storage;
pub mod commands;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use forecast::{Forecast, ForecastType, ValidationError};
pub use estimate::Estimate;
pub use storage::ForecastStore;

/// Result type alias for Forecaster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Forecaster operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Forecast not found: {0}")]
    ForecastNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
