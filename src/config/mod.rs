//! Configuration module
//!
//! Handles modem connection, protocol and logging settings

mod settings;

pub use settings::{AtSettings, ConfigError, LoggingConfig, ModemConfig, NmeaSettings};

use directories::ProjectDirs;
use std::path::PathBuf;

/// File name looked up in [`config_dir`]
pub const CONFIG_FILE: &str = "modem.toml";

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "nimo", "NimoModem").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}
