//! Configuration loading and typed config structures for the collector.
//!
//! The canonical configuration lives in `ticksight.yaml` next to the
//! binary. This module defines strongly-typed structs mirroring the
//! YAML structure and provides a loader that reads the file; every
//! field has a default so a missing file or empty document is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level collector configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Gateway bind settings.
    pub api: ApiConfig,
    /// Tick sampling and metric collection cadence.
    pub sampling: SamplingConfig,
    /// `status` action settings.
    pub status: StatusConfig,
    /// Log capture and replay settings.
    pub logs: LogConfig,
    /// Admin action settings.
    pub admin: AdminConfig,
    /// Durable file locations.
    pub storage: StorageConfig,
}

impl CollectorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, serde_yml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(yaml)
    }

    /// Load from `path`, falling back to defaults when the file does
    /// not exist. Parse errors are still surfaced.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Gateway bind settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// The host address to bind to.
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Tick sampling and metric collection cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// The host loop's target tick rate, ticks per second.
    pub target_tick_rate: u32,
    /// Seconds between persisted metric samples.
    pub collection_interval_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_tick_rate: 20,
            collection_interval_secs: 60,
        }
    }
}

/// `status` action settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Whether `status` responses include the installed plugin list.
    pub show_plugins: bool,
    /// Location of the PNG served as the server icon.
    pub icon_file: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            show_plugins: false,
            icon_file: PathBuf::from("server-icon.png"),
        }
    }
}

/// Log capture and replay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// The append-only log file scanned for subscription replay.
    pub file: PathBuf,
    /// How many buffered lines `admin/logs/subscribe` replays.
    pub history_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("logs/latest.log"),
            history_lines: 50,
        }
    }
}

/// Admin action settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Console command dispatched by `admin/restart`.
    pub restart_command: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            restart_command: String::from("restart"),
        }
    }
}

/// Durable file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `token.txt` and the metric database.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Path of the shared-secret file.
    pub fn token_file(&self) -> PathBuf {
        self.data_dir.join("token.txt")
    }

    /// Path of the metric history database.
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("data.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}
