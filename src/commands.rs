//! Command layer - maps user commands onto the store and renders replies
//!
//! Every command produces a [`Reply`]: a short human-readable message plus the
//! structured data behind it. Failures never escape as errors; they are
//! rendered the same way a chat user would see them.

use std::collections::HashMap;

use chrono::{Local, TimeZone};
use serde::Serialize;
use tracing::{info, warn};

use crate::estimate::{self, Estimate};
use crate::forecast::{normalize_shortname, Forecast, ForecastType};
use crate::storage::ForecastStore;
use crate::{Error, Result};

/// The user issuing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub id: String,
    pub name: String,
}

impl Invoker {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Lookup of platform user ids to display names.
pub trait UserDirectory {
    fn display_name(&self, user_id: &str) -> Option<String>;
}

/// Map-backed directory, usually filled from the `[users]` config table
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }
}

impl UserDirectory for StaticDirectory {
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.names.get(user_id).cloned()
    }
}

/// Outcome of a command
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub ok: bool,
    pub text: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Reply {
    fn success(text: String, data: serde_json::Value) -> Self {
        Self {
            ok: true,
            text,
            data,
        }
    }

    fn failure(text: String) -> Self {
        Self {
            ok: false,
            text,
            data: serde_json::Value::Null,
        }
    }
}

/// Serves the forecast commands on top of a store.
pub struct CommandHandler<D> {
    store: ForecastStore,
    users: D,
}

impl<D: UserDirectory> CommandHandler<D> {
    pub fn new(store: ForecastStore, users: D) -> Self {
        Self { store, users }
    }

    pub fn store(&self) -> &ForecastStore {
        &self.store
    }

    fn author_name(&self, user_id: &str) -> String {
        self.users
            .display_name(user_id)
            .unwrap_or_else(|| user_id.to_string())
    }

    fn require_forecast(&self, shortname: &str) -> Result<Forecast> {
        self.store
            .get_forecast(shortname)?
            .ok_or_else(|| Error::ForecastNotFound(shortname.to_string()))
    }

    /// Register a new forecast authored by the invoker
    pub fn make_forecast(
        &self,
        invoker: &Invoker,
        shortname: &str,
        description: &str,
        forecast_type: ForecastType,
    ) -> Reply {
        let shortname = match normalize_shortname(shortname) {
            Ok(name) => name,
            Err(e) => return Reply::failure(format!("Failed to create forecast: {}", e)),
        };
        let result = self
            .store
            .create_forecast(shortname, description, &invoker.id, forecast_type);

        match result {
            Err(e) => Reply::failure(format!("Failed to create forecast: {}", e)),
            Ok(0) => Reply::failure("Failed to create forecast".to_string()),
            Ok(_) => {
                info!("{} created forecast {}", invoker.id, shortname);
                let forecast = Forecast::new(shortname, description, &invoker.id, forecast_type);
                Reply::success(
                    format!(
                        "{} created forecast `{}`.\nDescription: {}\nForecast type: `{}`",
                        invoker.name, shortname, description, forecast_type
                    ),
                    serde_json::to_value(&forecast).unwrap_or_default(),
                )
            }
        }
    }

    /// Submit an estimate; `raw` may carry a trailing `%`
    pub fn estimate(&self, invoker: &Invoker, shortname: &str, raw: &str) -> Reply {
        let shortname = match normalize_shortname(shortname) {
            Ok(name) => name,
            Err(e) => return Reply::failure(format!("Failed to create estimate: {}", e)),
        };
        let result = self.require_forecast(shortname).and_then(|forecast| {
            let value = estimate::validate_estimate(&forecast, raw)?;
            let rows = self.store.create_estimate(shortname, &invoker.id, value)?;
            Ok((rows, value))
        });

        match result {
            Err(e) => Reply::failure(format!("Failed to create estimate: {}", e)),
            Ok((0, _)) => Reply::failure("Failed to create estimate".to_string()),
            Ok((_, value)) => Reply::success(
                format!(
                    "{} estimated {} in forecast `{}`",
                    invoker.name,
                    raw.trim(),
                    shortname
                ),
                serde_json::json!({ "shortname": shortname, "estimate": value }),
            ),
        }
    }

    /// List every forecast
    pub fn list_forecasts(&self) -> Reply {
        match self.store.get_forecasts().collect::<Result<Vec<_>>>() {
            Err(e) => Reply::failure(format!("Failed to list forecasts: {}", e)),
            Ok(forecasts) if forecasts.is_empty() => {
                Reply::success("No forecasts yet.".to_string(), serde_json::json!([]))
            }
            Ok(forecasts) => self.render_forecasts(&forecasts),
        }
    }

    /// List the forecasts authored by one user
    pub fn user_forecasts(&self, user_id: &str) -> Reply {
        match self
            .store
            .get_forecasts_by_author(user_id)
            .collect::<Result<Vec<_>>>()
        {
            Err(e) => Reply::failure(format!("Failed to list forecasts: {}", e)),
            Ok(forecasts) if forecasts.is_empty() => Reply::success(
                format!("{} has no forecasts.", self.author_name(user_id)),
                serde_json::json!([]),
            ),
            Ok(forecasts) => self.render_forecasts(&forecasts),
        }
    }

    fn render_forecasts(&self, forecasts: &[Forecast]) -> Reply {
        let blocks: Vec<String> = forecasts
            .iter()
            .map(|f| {
                format!(
                    "Shortname: `{}`\nDescription: {}\nType: `{}`\nAuthor: {}\nResolution: {}\n",
                    f.shortname,
                    f.description,
                    f.forecast_type,
                    self.author_name(&f.author),
                    f.resolution
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "unresolved".to_string()),
                )
            })
            .collect();
        Reply::success(
            blocks.join("---\n"),
            serde_json::to_value(forecasts).unwrap_or_default(),
        )
    }

    /// List the estimates for a forecast, oldest first
    pub fn list_estimates(&self, shortname: &str) -> Reply {
        let shortname = match normalize_shortname(shortname) {
            Ok(name) => name,
            Err(e) => return Reply::failure(format!("Failed to list estimates: {}", e)),
        };
        let estimates = match self.store.get_estimates(shortname).collect::<Result<Vec<Estimate>>>() {
            Ok(estimates) => estimates,
            Err(e) => return Reply::failure(format!("Failed to list estimates: {}", e)),
        };
        if estimates.is_empty() {
            return Reply::success(
                format!("No estimates for `{}`.", shortname),
                serde_json::json!([]),
            );
        }

        let lines: Vec<String> = estimates
            .iter()
            .map(|e| {
                format!(
                    "{} estimated \t{}\t at {}",
                    self.author_name(&e.author),
                    e.estimate,
                    format_time(e.time)
                )
            })
            .collect();
        Reply::success(
            lines.join("\n"),
            serde_json::to_value(&estimates).unwrap_or_default(),
        )
    }

    /// Record the outcome of a forecast. A second resolution overwrites the first.
    pub fn resolve(&self, invoker: &Invoker, shortname: &str, raw: &str) -> Reply {
        let shortname = match normalize_shortname(shortname) {
            Ok(name) => name,
            Err(e) => return Reply::failure(format!("Failed to record resolution: {}", e)),
        };
        let result = self.require_forecast(shortname).and_then(|forecast| {
            let value = estimate::validate_resolution(&forecast, raw)?;
            if let Some(previous) = forecast.resolution {
                warn!(
                    "{} re-resolving {} (was {}, now {})",
                    invoker.id, shortname, previous, value
                );
            }
            let rows = self.store.resolve_forecast(shortname, value)?;
            Ok((rows, value))
        });

        match result {
            Err(e) => Reply::failure(format!("Failed to record resolution: {}", e)),
            Ok((0, _)) => Reply::failure("Failed to record resolution".to_string()),
            Ok((_, value)) => {
                info!("{} resolved {} to {}", invoker.id, shortname, value);
                Reply::success(
                    format!("Forecast `{}` resolved to {}!", shortname, raw.trim()),
                    serde_json::json!({ "shortname": shortname, "resolution": value }),
                )
            }
        }
    }
}

/// Render an epoch-seconds timestamp in local time
pub fn format_time(time: i64) -> String {
    match Local.timestamp_opt(time, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => time.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (tempfile::TempDir, CommandHandler<StaticDirectory>) {
        let dir = tempfile::tempdir().unwrap();
        let store = ForecastStore::open(&dir.path().join("data.db")).unwrap();
        let mut names = HashMap::new();
        names.insert("1001".to_string(), "alice".to_string());
        (dir, CommandHandler::new(store, StaticDirectory::new(names)))
    }

    fn alice() -> Invoker {
        Invoker::new("1001", "alice")
    }

    #[test]
    fn test_make_forecast_reply() {
        let (_dir, handler) = handler();
        let reply = handler.make_forecast(&alice(), "rain-tmrw", "Will it rain tomorrow", ForecastType::Probability);
        assert!(reply.ok);
        assert!(reply.text.contains("alice created forecast `rain-tmrw`"));
        assert!(reply.text.contains("`PROB`"));
    }

    #[test]
    fn test_duplicate_forecast_reports_failure() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "x", "first", ForecastType::Numeric);
        let reply = handler.make_forecast(&alice(), "x", "second", ForecastType::Numeric);
        assert!(!reply.ok);
        assert!(reply.text.starts_with("Failed to create forecast:"));
    }

    #[test]
    fn test_empty_shortname_rejected() {
        let (_dir, handler) = handler();
        let reply = handler.make_forecast(&alice(), "  ", "desc", ForecastType::Numeric);
        assert!(!reply.ok);
        assert_eq!(handler.store().stats().unwrap().forecasts, 0);
    }

    #[test]
    fn test_estimate_percent_is_stored_normalized() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "rain", "Rain?", ForecastType::Probability);

        let reply = handler.estimate(&alice(), "rain", "37%");
        assert!(reply.ok, "{}", reply.text);
        assert_eq!(reply.text, "alice estimated 37% in forecast `rain`");

        let stored = handler.store().get_estimates("rain").next().unwrap().unwrap();
        assert_eq!(stored.estimate, 0.37);
        assert_eq!(stored.author, "1001");
    }

    #[test]
    fn test_out_of_range_estimate_writes_nothing() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "rain", "Rain?", ForecastType::Probability);

        for raw in ["1.5", "-10%", "nan", "inf", "lots"] {
            let reply = handler.estimate(&alice(), "rain", raw);
            assert!(!reply.ok, "{raw} should fail");
            assert!(reply.text.starts_with("Failed to create estimate:"));
        }
        assert_eq!(handler.store().stats().unwrap().estimates, 0);
    }

    #[test]
    fn test_padded_shortname_names_the_same_forecast() {
        let (_dir, handler) = handler();
        assert!(handler.make_forecast(&alice(), " rain ", "Rain?", ForecastType::Probability).ok);
        assert!(handler.store().get_forecast("rain").unwrap().is_some());

        assert!(handler.estimate(&alice(), " rain ", "50%").ok);
        assert!(handler.estimate(&alice(), "rain", "0.8").ok);
        let listed = handler.list_estimates(" rain");
        assert_eq!(listed.text.lines().count(), 2);

        assert!(handler.resolve(&alice(), "rain ", "1").ok);
        assert_eq!(handler.store().get_forecast("rain").unwrap().unwrap().resolution, Some(1.0));
    }

    #[test]
    fn test_plain_decimal_estimate_stored_as_is() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "rain", "Rain?", ForecastType::Probability);
        assert!(handler.estimate(&alice(), "rain", "0.8").ok);

        let stored = handler.store().get_estimates("rain").next().unwrap().unwrap();
        assert_eq!(stored.estimate, 0.8);
    }

    #[test]
    fn test_estimate_on_missing_forecast() {
        let (_dir, handler) = handler();
        let reply = handler.estimate(&alice(), "ghost", "0.5");
        assert!(!reply.ok);
        assert!(reply.text.contains("Forecast not found: ghost"));
    }

    #[test]
    fn test_estimate_after_resolution_refused() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "rain", "Rain?", ForecastType::Probability);
        assert!(handler.resolve(&alice(), "rain", "1").ok);

        let reply = handler.estimate(&alice(), "rain", "0.4");
        assert!(!reply.ok);
        assert!(reply.text.contains("already resolved"));
        assert_eq!(handler.store().stats().unwrap().estimates, 0);
    }

    #[test]
    fn test_resolve_missing_forecast() {
        let (_dir, handler) = handler();
        let reply = handler.resolve(&alice(), "X", "1.0");
        assert!(!reply.ok);
        assert!(reply.text.starts_with("Failed to record resolution"));
    }

    #[test]
    fn test_list_forecasts_uses_display_names() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "a", "first", ForecastType::Numeric);
        handler.make_forecast(&Invoker::new("2002", "bob"), "b", "second", ForecastType::Numeric);

        let reply = handler.list_forecasts();
        assert!(reply.ok);
        assert!(reply.text.contains("Author: alice"));
        // unknown ids fall back to the raw id
        assert!(reply.text.contains("Author: 2002"));
        assert!(reply.text.contains("Resolution: unresolved"));
        assert_eq!(reply.data.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_list_forecasts_empty() {
        let (_dir, handler) = handler();
        let reply = handler.list_forecasts();
        assert!(reply.ok);
        assert_eq!(reply.text, "No forecasts yet.");
    }

    #[test]
    fn test_user_forecasts() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "a", "first", ForecastType::Numeric);
        handler.make_forecast(&Invoker::new("2002", "bob"), "b", "second", ForecastType::Numeric);

        let reply = handler.user_forecasts("1001");
        assert!(reply.text.contains("`a`"));
        assert!(!reply.text.contains("`b`"));

        let reply = handler.user_forecasts("3003");
        assert_eq!(reply.text, "3003 has no forecasts.");
    }

    #[test]
    fn test_list_estimates_lines() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "temp", "High", ForecastType::Numeric);
        handler.store().create_estimate_at("temp", "1001", 30.0, 20).unwrap();
        handler.store().create_estimate_at("temp", "1001", 25.0, 10).unwrap();

        let reply = handler.list_estimates("temp");
        let lines: Vec<&str> = reply.text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("alice estimated \t25\t at "));
        assert!(lines[1].contains("\t30\t"));

        let empty = handler.list_estimates("none");
        assert_eq!(empty.text, "No estimates for `none`.");
    }

    #[test]
    fn test_resolve_twice_keeps_latest() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "coin", "Heads?", ForecastType::Probability);
        assert!(handler.resolve(&alice(), "coin", "1").ok);
        let reply = handler.resolve(&alice(), "coin", "0");
        assert!(reply.ok);
        assert_eq!(reply.text, "Forecast `coin` resolved to 0!");
        let forecast = handler.store().get_forecast("coin").unwrap().unwrap();
        assert_eq!(forecast.resolution, Some(0.0));
    }

    #[test]
    fn test_probability_resolution_out_of_range() {
        let (_dir, handler) = handler();
        handler.make_forecast(&alice(), "coin", "Heads?", ForecastType::Probability);
        let reply = handler.resolve(&alice(), "coin", "2");
        assert!(!reply.ok);
        assert_eq!(handler.store().get_forecast("coin").unwrap().unwrap().resolution, None);
    }
}
