//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for runtime settings.  It is
//! assembled in `main.rs` from, in increasing precedence: built-in defaults,
//! an optional TOML file ([`BridgeFileConfig`]), and CLI flags / environment
//! variables.
//!
//! Keeping configuration as a plain struct (no environment reads in here) makes
//! the bridge easy to embed in tests.

use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};
use serial_core::SerialConfig;

/// Port the WebSocket server listens on by default.
pub const DEFAULT_WS_PORT: u16 = 8080;

/// Address the WebSocket server binds to by default (all interfaces).
pub const DEFAULT_WS_BIND: &str = "0.0.0.0";

/// All runtime configuration for the WebSocket bridge.
///
/// # Example
///
/// ```rust
/// use serial_ws_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 8080);
/// assert_eq!(cfg.serial.baud_rate, 115_200);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket server binds to.
    ///
    /// Connections are unauthenticated, so bind to `127.0.0.1` when the
    /// device should only be reachable from the local machine.
    pub ws_bind_addr: SocketAddr,

    /// The serial device to relay to.
    pub serial: SerialConfig,
}

impl Default for BridgeConfig {
    /// | Field          | Default         |
    /// |----------------|-----------------|
    /// | ws_bind_addr   | `0.0.0.0:8080`  |
    /// | serial         | `/dev/ttyUSB0` @ 115200 |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            serial: SerialConfig::default(),
        }
    }
}

/// Schema of the optional TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeFileConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub server: ServerSection,
}

/// `[server]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSection {
    /// IP address to bind the WebSocket listener to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TCP port for the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServerSection {
    /// Parses `bind:port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind` is not an IP address literal.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

fn default_bind() -> String {
    DEFAULT_WS_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_WS_PORT
}

// ── Tests ─────────────────────────────────────────────────────────────────────
