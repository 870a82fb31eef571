//! Serial connection settings and TOML config file loading.
//!
//! The bridges work out of the box with the defaults below.  An optional TOML
//! file can override them; CLI flags override the file.  Example:
//!
//! ```toml
//! [serial]
//! port_path = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [server]
//! port = 8080
//! ```
//!
//! Only the `[serial]` section is defined here.  Each binary declares its own
//! top-level file schema and loads it with [`load_config_file`].
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to the default
//! when absent, so a partial file (or an empty one) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device path used when nothing else is configured.
pub const DEFAULT_PORT_PATH: &str = "/dev/ttyUSB0";

/// Baud rate the ESP32 firmware's UART is configured for.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed into the expected schema.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for the single serial connection a bridge owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`, `/dev/tty.usbserial-XXXX` or `COM3`.
    #[serde(default = "default_port_path")]
    pub port_path: String,

    /// Line speed in baud.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long the reader thread blocks per `read()` before re-checking
    /// whether anyone is still listening.
    ///
    /// This is a polling interval, not a data timeout: an idle device never
    /// produces an error.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Size of the reader's scratch buffer.  Upper bound on a single chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl SerialConfig {
    /// Creates a config for `port_path` with every other field defaulted.
    pub fn new(port_path: impl Into<String>) -> Self {
        Self {
            port_path: port_path.into(),
            ..Self::default()
        }
    }

    /// Sets the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// The reader polling interval as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_path: default_port_path(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_port_path() -> String {
    DEFAULT_PORT_PATH.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    100
}

fn default_chunk_size() -> usize {
    1024
}

/// Reads and parses a TOML config file into `T`.
///
/// # Errors
///
/// - [`ConfigError::Io`] if the file cannot be read.
/// - [`ConfigError::Parse`] if the content is not valid TOML for `T`.
pub fn load_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
