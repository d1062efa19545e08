//! Configuration module for Entire.Life.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Entire.Life.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub google: GoogleConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name of the remote folder holding one spreadsheet per ledger.
    pub folder_name: String,
    /// Seconds a deleted entry is remembered before its tombstone is purged.
    pub tombstone_retention_secs: u64,
    /// Seconds between cycles when running `sync --watch`.
    pub watch_interval_secs: u64,
}

/// Google Drive / Sheets settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client ID. `None` until the user configures one.
    pub client_id: Option<String>,
    /// OAuth client secret, required by Google for desktop clients.
    pub client_secret: Option<String>,
    /// API key sent as the `key` query parameter.
    pub api_key: Option<String>,
    /// Local port the OAuth redirect is received on.
    pub redirect_port: u16,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database holding ledgers, tombstones and the credential.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/entirelife/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("entirelife")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            folder_name: "Entire.Life".to_string(),
            tombstone_retention_secs: 20,
            watch_interval_secs: 300,
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_key: None,
            redirect_port: 8400,
            http_timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("entirelife");
        Self {
            database: data_dir.join("entirelife.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.folder_name"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        let folder = self.sync.folder_name.trim();
        if folder.is_empty() {
            errors.push(ValidationError {
                field: "sync.folder_name".into(),
                message: "must not be empty".into(),
            });
        } else if folder != self.sync.folder_name {
            errors.push(ValidationError {
                field: "sync.folder_name".into(),
                message: "must not start or end with whitespace".into(),
            });
        }
        if self.sync.watch_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.watch_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- google ---
        if matches!(&self.google.client_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError {
                field: "google.client_id".into(),
                message: "must not be empty when set".into(),
            });
        }
        if self.google.redirect_port == 0 {
            errors.push(ValidationError {
                field: "google.redirect_port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.google.http_timeout_secs == 0 || self.google.http_timeout_secs > 600 {
            errors.push(ValidationError {
                field: "google.http_timeout_secs".into(),
                message: "must be in range 1..=600".into(),
            });
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
