//! Application settings

use crate::core::serial::{ConfigError, SerialConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings load/save errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// No platform config directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`AppConfig`]
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Config could not be rendered
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An external port entry is out of range
    #[error("Invalid external port: {0}")]
    Port(#[from] ConfigError),

    /// The worker would never wait for traffic
    #[error("network.poll_interval_ms must be at least 1")]
    ZeroPollInterval,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Network shape and timing
    pub network: NetworkSettings,
    /// Serial devices attached at start
    pub external: Vec<SerialConfig>,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from the default location, or defaults if there is no file yet
    pub fn load() -> Result<Self, SettingsError> {
        let path = default_path().ok_or(SettingsError::NoConfigDir)?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = default_path().ok_or(SettingsError::NoConfigDir)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        self.save_to(&path)
    }

    /// Save to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the network timing and every external port entry
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.network.poll_interval_ms == 0 {
            return Err(SettingsError::ZeroPollInterval);
        }
        for port in &self.external {
            port.validate()?;
        }
        Ok(())
    }
}

/// Network settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Virtual ports created at start
    pub virtual_ports: usize,
    /// Echo each port's bytes back to itself
    pub loopback: bool,
    /// Run a fixed two-port pair instead of a network
    pub pair: bool,
    /// Readiness wait per loop iteration, in milliseconds
    pub poll_interval_ms: u64,
    /// Wait for the worker to exit on stop, in seconds
    pub stop_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            virtual_ports: 2,
            loopback: false,
            pair: false,
            poll_interval_ms: 1000,
            stop_timeout_secs: 5,
        }
    }
}

impl NetworkSettings {
    /// Readiness wait as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Stop wait as a duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. "info", "serialnet_core=debug")
    pub level: String,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
    /// JSON log lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

/// Default config file path
pub fn default_path() -> Option<PathBuf> {
    super::config_dir().map(|dir| dir.join("config.toml"))
}
