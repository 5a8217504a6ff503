use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "progress-ledger";
const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "progress-ledger.db";

pub const DEFAULT_LOG_FILTER: &str = "progress_ledger=info,tower_http=debug";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database. Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Port for `serve`.
    pub port: u16,
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: 3000,
            log_filter: None,
        }
    }
}

impl Config {
    /// Config file from the user's config directory, then environment
    /// overrides. Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let base = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Applies `PLEDGER_DATA_DIR`, `PLEDGER_PORT` and `RUST_LOG`.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var("PLEDGER_DATA_DIR").filter(|s| !s.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = var("PLEDGER_PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        if let Some(filter) = var("RUST_LOG").filter(|s| !s.is_empty()) {
            self.log_filter = Some(filter);
        }
        self
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Database file location: `data_dir` if configured, else the platform default.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join(DB_FILE)),
            None => crate::db::default_db_path(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
