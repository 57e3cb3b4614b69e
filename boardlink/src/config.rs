//! Configuration management for boardlink.
//!
//! The daemon reads a TOML file describing which boards are attached and on
//! which serial ports. The serial read timeout can be overridden from the
//! environment with `BOARDLINK_SERIAL_TIMEOUT_MS`.
//!
//! ```toml
//! [serial]
//! timeout_ms = 250
//!
//! [[boards]]
//! kind = "sb-arduino"
//! port = "/dev/ttyACM0"
//! serial = "7523031383335161B0B1"
//! ```

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::error::{Error, Result};

/// Environment variable overriding [`SerialSettings::timeout_ms`].
pub const TIMEOUT_ENV_VAR: &str = "BOARDLINK_SERIAL_TIMEOUT_MS";

const DEFAULT_TIMEOUT_MS: u64 = 250;

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Settings shared by every serial transport
    #[serde(default)]
    pub serial: SerialSettings,

    /// Boards to open at startup
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

/// Serial transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialSettings {
    /// How long to wait for a response line before giving up
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Which driver handles a configured board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardKind {
    /// SourceBots Arduino running the SBDuino GPIO firmware
    SbArduino,
    /// Student Robotics v4 motor board
    SrV4Motor,
}

/// One attached board.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    pub kind: BoardKind,

    /// Serial port device node (e.g., "/dev/ttyACM0")
    pub port: String,

    /// Board serial number, used as its identity
    pub serial: String,
}

impl Config {
    /// Load configuration from a specific file, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::parse(&text)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(TIMEOUT_ENV_VAR) {
            self.serial.timeout_ms = value.parse().map_err(|_| {
                Error::Config(format!("{TIMEOUT_ENV_VAR} must be an integer, got {value:?}"))
            })?;
        }
        Ok(())
    }
}
