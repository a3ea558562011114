//! Configuration management for tilawa-ap
//!
//! Two tiers:
//! 1. **TOML bootstrap**: port, root folder, database path, metadata URL, logging
//! 2. **Command line / environment**: overrides for port and root folder
//!
//! Runtime state (the selected reciter) lives in the `settings` table, not here.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TILAWA_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup; the service must restart to pick up changes.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root folder holding the audio cache and settings database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Path to SQLite database file (default: `<root>/tilawa.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Chapter metadata endpoint; built-in verse counts are used when absent
    #[serde(default)]
    pub chapters_url: Option<String>,

    /// Timeout applied to remote audio and metadata requests
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5730
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root_folder: None,
            database_path: None,
            chapters_url: None,
            http_timeout_secs: default_http_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load from an explicit file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the given file, else the platform config file, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match tilawa_common::config::find_config_file() {
            Ok(found) => {
                info!("Using config file {}", found.display());
                Self::load(&found)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Resolved audio player configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub cache_root: PathBuf,
    pub db_path: PathBuf,
    pub port: u16,
    pub chapters_url: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    /// Combine command line overrides with the TOML bootstrap config
    ///
    /// Root folder priority: CLI, environment, `root_folder` in the config
    /// file, OS default.
    pub fn resolve(
        toml: &TomlConfig,
        config_file: Option<&Path>,
        cli_root_folder: Option<&Path>,
        cli_port: Option<u16>,
    ) -> Result<Self> {
        let cli_root = cli_root_folder.map(|p| p.to_string_lossy().into_owned());
        let root_folder = tilawa_common::config::resolve_root_folder(
            cli_root.as_deref(),
            ROOT_FOLDER_ENV,
            config_file,
        )?;

        let db_path = toml
            .database_path
            .clone()
            .unwrap_or_else(|| root_folder.join("tilawa.db"));

        Ok(Self {
            cache_root: root_folder.join("audio"),
            db_path,
            port: cli_port.unwrap_or(toml.port),
            chapters_url: toml.chapters_url.clone(),
            http_timeout: Duration::from_secs(toml.http_timeout_secs),
            root_folder,
        })
    }
}
