//! Configuration module
//!
//! Handles application settings stored as TOML

mod settings;

pub use settings::{default_path, AppConfig, LoggingConfig, NetworkSettings, SettingsError};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "serialnet", "Serialnet")
        .map(|dirs| dirs.config_dir().to_path_buf())
}
