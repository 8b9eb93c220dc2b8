//! Database schema definitions

/// SQL to create the forecasts table
pub const CREATE_FORECASTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS forecasts (
    shortname TEXT PRIMARY KEY,
    description TEXT,
    author TEXT,
    forecast_type INT DEFAULT 1,
    resolution REAL
)
"#;

/// SQL to create the estimates table
///
/// The foreign key is declared only: every connection runs
/// `PRAGMA foreign_keys = OFF`, so it is not enforced.
pub const CREATE_ESTIMATES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS estimates (
    shortname TEXT,
    author TEXT,
    time INT,
    estimate REAL,
    FOREIGN KEY (shortname)
        REFERENCES forecasts (shortname)
            ON DELETE CASCADE
            ON UPDATE NO ACTION
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_estimates_shortname_time ON estimates(shortname, time)",
    "CREATE INDEX IF NOT EXISTS idx_forecasts_author ON forecasts(author)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_FORECASTS_TABLE, CREATE_ESTIMATES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
