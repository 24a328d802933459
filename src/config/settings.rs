//! Modem settings

use crate::core::command::DEFAULT_AT_TIMEOUT;
use crate::core::message::Manufacturer;
use crate::core::protocol::nmea::CoordinateResolution;
use crate::core::transport::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`ModemConfig`]
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Complete modem configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Modem vendor, selects the record layout
    pub manufacturer: Manufacturer,
    /// Serial line
    pub serial: SerialConfig,
    /// AT command transport
    pub at: AtSettings,
    /// Location decoding
    pub nmea: NmeaSettings,
    /// Log output
    pub logging: LoggingConfig,
}

impl ModemConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the platform config directory, or defaults when absent
    pub fn load_default() -> Result<Self, ConfigError> {
        match super::config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "serial.baud_rate",
                reason: "must be positive".into(),
            });
        }
        if self.at.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "at.timeout_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// AT command transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtSettings {
    /// Modem echoes commands
    pub echo: bool,
    /// Modem uses verbose result codes
    pub verbose: bool,
    /// Modem expects CRC-suffixed commands
    pub crc: bool,
    /// Initial CRC register (0 for XMODEM)
    pub crc_seed: u16,
    /// Response timeout in seconds
    pub timeout_secs: u64,
    /// Log parser internals at debug level
    pub trace: bool,
}

impl Default for AtSettings {
    fn default() -> Self {
        Self {
            echo: true,
            verbose: true,
            crc: false,
            crc_seed: 0,
            timeout_secs: DEFAULT_AT_TIMEOUT.as_secs(),
            trace: false,
        }
    }
}

impl AtSettings {
    /// Response timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Location decoding settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmeaSettings {
    /// Minutes conversion for coordinates
    pub resolution: CoordinateResolution,
    /// Log every decoded field at debug level
    pub trace: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
