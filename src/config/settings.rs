//! Configuration settings for tickerdeck.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `TICKERDECK_API__BASE_URL`.
const ENV_PREFIX: &str = "TICKERDECK";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,
    /// Refresh cadences.
    pub polling: PollingConfig,
    /// Durable preference storage.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration from file, then apply environment overrides.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(default_path);
        Self::load_with_env(&config_path, ENV_PREFIX)
    }

    fn load_with_env(config_path: &Path, env_prefix: &str) -> crate::Result<Self> {
        Self::load_from(config_path, env_source(env_prefix))
    }

    fn load_from(config_path: &Path, env: ::config::Environment) -> crate::Result<Self> {
        ::config::Config::builder()
            .add_source(::config::File::from(config_path.to_path_buf()).required(false))
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| crate::Error::config(e.to_string()))
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

/// `PREFIX_SECTION__FIELD`, e.g. `TICKERDECK_API__BASE_URL`.
fn env_source(prefix: &str) -> ::config::Environment {
    ::config::Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn default_path() -> PathBuf {
    super::config_dir()
        .map(|p| p.join("config.toml"))
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Backend API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API base URL.
    pub base_url: String,
    /// WebSocket URL. Declared for the render layer; the core never dials it.
    pub ws_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Refresh cadences for the polling views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Single-symbol detail view refresh interval in seconds.
    pub detail_refresh_secs: u64,
    /// Multi-symbol list view refresh interval in seconds.
    pub list_refresh_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            detail_refresh_secs: 30,
            list_refresh_secs: 60,
        }
    }
}

impl PollingConfig {
    /// Detail view refresh interval.
    pub fn detail_interval(&self) -> Duration {
        Duration::from_secs(self.detail_refresh_secs.max(1))
    }

    /// List view refresh interval.
    pub fn list_interval(&self) -> Duration {
        Duration::from_secs(self.list_refresh_secs.max(1))
    }
}

/// Durable preference storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the preference file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the preference file path.
    pub fn resolve_path(&self) -> crate::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => super::data_dir().map(|dir| dir.join("preferences.json")),
        }
    }
}
