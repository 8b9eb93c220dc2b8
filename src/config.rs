use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::commands::StaticDirectory;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ForecasterConfig {
    pub database: Option<String>,
    /// Display names keyed by platform user id
    #[serde(default)]
    pub users: HashMap<String, String>,
}

impl ForecasterConfig {
    /// Database path, falling back to `./data.db`
    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }

    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory::new(self.users.clone())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("forecaster.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("data.db")
}

/// Load `forecaster.toml` (or `path`); a missing file is not an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ForecasterConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read forecaster config {}", path.display()))?;
    let config: ForecasterConfig = toml::from_str(&contents)
        .with_context(|| format!("invalid forecaster config {}", path.display()))?;
    tracing::debug!(
        "Loaded config from {} ({} named users)",
        path.display(),
        config.users.len()
    );
    Ok(Some(config))
}

/// Write a config file, refusing to replace an existing one unless `force` is set.
pub fn write_config(path: &Path, config: &ForecasterConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "forecaster config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let contents = toml::to_string_pretty(config).context("failed to encode forecaster config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write forecaster config {}", path.display()))?;
    Ok(())
}
