//! On-disk configuration.
//!
//! Loaded from a TOML file; every key is optional and falls back to a
//! built-in default, so an empty or missing file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::app::{FreshetError, Result};
use crate::fetcher::http_fetcher::DEFAULT_TIMEOUT_SECS;
use crate::refresh::scheduler::{DEFAULT_TICK_SECS, DEFAULT_WORKERS};
use crate::refresh::SchedulerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub fetch: FetchConfig,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub tick_secs: u64,
    pub workers: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Load from `path` when given, else from the default location if a file
    /// exists there, else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| FreshetError::Config(format!("{}: {e}", path.display())))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("freshet").join("config.toml"))
    }

    /// Database file, creating its parent directory if needed.
    pub fn database_path(&self) -> Result<PathBuf> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .ok_or_else(|| {
                    FreshetError::Config("could not determine a data directory".into())
                })?
                .join("freshet")
                .join("freshet.db"),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_secs: self.scheduler.tick_secs,
            workers: self.scheduler.workers,
        }
    }
}
