//! Connection configuration
//!
//! Describes how to reach the controller bus. Stored as JSON:
//!
//! ```json
//! { "device": "socket", "host": "192.168.1.40", "port": 23 }
//! ```
//!
//! Missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid configuration JSON
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A field holds a value the selected device cannot use
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Which transport to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// RS-485 to Ethernet adapter
    #[default]
    Socket,
    /// Local RS-485 serial adapter
    Serial,
    /// Simulated controller
    Demo,
}

/// How to connect to the controller, and how to behave once connected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Transport to connect with
    pub device: DeviceKind,
    /// Adapter host for [`DeviceKind::Socket`]
    pub host: String,
    /// Adapter port for [`DeviceKind::Socket`]
    pub port: u16,
    /// Device path for [`DeviceKind::Serial`]
    pub path: String,
    /// Wait between a lost connection and the next attempt
    pub reconnect_interval_secs: u64,
    /// Allow low-speed filter control
    pub multi_speed_pump: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Socket,
            host: "localhost".to_string(),
            port: 23,
            path: "/dev/ttyUSB0".to_string(),
            reconnect_interval_secs: 10,
            multi_speed_pump: true,
        }
    }
}

impl ConnectionConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ConnectionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check the fields the selected device needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.device {
            DeviceKind::Socket => {
                if self.host.trim().is_empty() {
                    return Err(invalid("host", "must not be empty"));
                }
                if self.port == 0 {
                    return Err(invalid("port", "must be between 1 and 65535"));
                }
            }
            DeviceKind::Serial => {
                if self.path.trim().is_empty() {
                    return Err(invalid("path", "must not be empty"));
                }
            }
            DeviceKind::Demo => {}
        }
        Ok(())
    }

    /// Wait between a lost connection and the next attempt
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    /// Human-readable endpoint for log messages
    pub fn endpoint(&self) -> String {
        match self.device {
            DeviceKind::Socket => format!("{}:{}", self.host, self.port),
            DeviceKind::Serial => self.path.clone(),
            DeviceKind::Demo => "demo controller".to_string(),
        }
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
