//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use super::rows::RowStream;
use super::schema;
use crate::Result;
use crate::estimate::Estimate;
use crate::forecast::{Forecast, ForecastType};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_FORECASTS: &str =
    "SELECT shortname, description, author, forecast_type, resolution FROM forecasts";

const SELECT_FORECASTS_BY_AUTHOR: &str =
    "SELECT shortname, description, author, forecast_type, resolution FROM forecasts WHERE author = ?1";

const SELECT_ESTIMATES: &str = r#"
SELECT shortname, author, time, estimate FROM estimates
WHERE shortname = ?1
ORDER BY time ASC, rowid ASC
"#;

/// Open a fresh connection to the database file
pub(crate) fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // the bundled SQLite enforces foreign keys by default; estimates may
    // reference shortnames that have no forecast row
    conn.pragma_update(None, "foreign_keys", false)?;
    Ok(conn)
}

/// SQLite-backed storage for forecasts and estimates.
///
/// The store only remembers where the database lives. Each operation opens
/// its own connection, runs a single statement in autocommit mode and closes
/// the connection again when it goes out of scope.
#[derive(Debug, Clone)]
pub struct ForecastStore {
    path: PathBuf,
}

impl ForecastStore {
    /// Open a database file (creates if doesn't exist) and ensure the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            path: path.to_path_buf(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        open_connection(&self.path)
    }

    /// Initialize the database schema
    ///
    /// Switches the file to WAL so a partially-consumed [`RowStream`] does not
    /// block writers.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Journal mode {}", mode);
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        debug!("Schema ready at {}", self.path.display());
        Ok(())
    }

    // ========== Forecast Operations ==========

    /// Insert a new, unresolved forecast. A taken shortname is a constraint error.
    pub fn create_forecast(
        &self,
        shortname: &str,
        description: &str,
        author: &str,
        forecast_type: ForecastType,
    ) -> Result<usize> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "INSERT INTO forecasts (shortname, description, author, forecast_type, resolution) VALUES (?1, ?2, ?3, ?4, NULL)",
            params![shortname, description, author, forecast_type.code()],
        )?;
        debug!("Created forecast {} ({})", shortname, forecast_type);
        Ok(rows)
    }

    /// Get a forecast by shortname
    pub fn get_forecast(&self, shortname: &str) -> Result<Option<Forecast>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT shortname, description, author, forecast_type, resolution FROM forecasts WHERE shortname = ?1",
            [shortname],
            row_to_forecast,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Stream every forecast in storage order
    pub fn get_forecasts(&self) -> RowStream<Forecast> {
        RowStream::spawn(self.path.clone(), SELECT_FORECASTS, Vec::new(), row_to_forecast)
    }

    /// Stream the forecasts created by one author
    pub fn get_forecasts_by_author(&self, author: &str) -> RowStream<Forecast> {
        RowStream::spawn(
            self.path.clone(),
            SELECT_FORECASTS_BY_AUTHOR,
            vec![author.to_string()],
            row_to_forecast,
        )
    }

    /// Set the resolution of a forecast. Returns 0 when the shortname is unknown.
    ///
    /// An existing resolution is overwritten.
    pub fn resolve_forecast(&self, shortname: &str, resolution: f64) -> Result<usize> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE forecasts SET resolution = ?1 WHERE shortname = ?2",
            params![resolution, shortname],
        )?;
        debug!("Resolved {} to {} ({} rows)", shortname, resolution, rows);
        Ok(rows)
    }

    // ========== Estimate Operations ==========

    /// Insert an estimate stamped with the current time
    pub fn create_estimate(&self, shortname: &str, author: &str, estimate: f64) -> Result<usize> {
        self.create_estimate_at(shortname, author, estimate, chrono::Utc::now().timestamp())
    }

    /// Insert an estimate with an explicit epoch-seconds timestamp.
    ///
    /// The shortname is not checked against the forecasts table.
    pub fn create_estimate_at(
        &self,
        shortname: &str,
        author: &str,
        estimate: f64,
        time: i64,
    ) -> Result<usize> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "INSERT INTO estimates (shortname, author, time, estimate) VALUES (?1, ?2, ?3, ?4)",
            params![shortname, author, time, estimate],
        )?;
        debug!("Estimate {} on {} by {}", estimate, shortname, author);
        Ok(rows)
    }

    /// Stream the estimates for a forecast, oldest first
    pub fn get_estimates(&self, shortname: &str) -> RowStream<Estimate> {
        RowStream::spawn(
            self.path.clone(),
            SELECT_ESTIMATES,
            vec![shortname.to_string()],
            row_to_estimate,
        )
    }

    // ========== Statistics ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.connect()?;
        let (forecasts, resolved): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(resolution) FROM forecasts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let estimates: i64 =
            conn.query_row("SELECT COUNT(*) FROM estimates", [], |row| row.get(0))?;

        Ok(DbStats {
            forecasts: forecasts as usize,
            resolved: resolved as usize,
            estimates: estimates as usize,
        })
    }
}

/// Helper to convert a row to a Forecast
fn row_to_forecast(row: &rusqlite::Row<'_>) -> rusqlite::Result<Forecast> {
    let code: Option<i64> = row.get(3)?;
    // NULL falls back to the column default
    let code = code.unwrap_or(1);
    let forecast_type = ForecastType::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Integer,
            format!("unknown forecast type code {}", code).into(),
        )
    })?;

    Ok(Forecast {
        shortname: row.get(0)?,
        description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        author: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        forecast_type,
        resolution: row.get(4)?,
    })
}

/// Helper to convert a row to an Estimate
fn row_to_estimate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Estimate> {
    Ok(Estimate {
        shortname: row.get(0)?,
        author: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        time: row.get(2)?,
        estimate: row.get(3)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub forecasts: usize,
    pub resolved: usize,
    pub estimates: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Forecasts: {}", self.forecasts)?;
        writeln!(f, "  Resolved: {}", self.resolved)?;
        writeln!(f, "  Estimates: {}", self.estimates)
    }
}
