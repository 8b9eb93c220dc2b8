//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with tables:
//! - forecasts(shortname, description, author, forecast_type, resolution)
//! - estimates(shortname, author, time, estimate)

pub mod rows;
pub mod schema;
pub mod sqlite;

pub use rows::RowStream;
pub use sqlite::{DbStats, ForecastStore};
