//! Serial-to-WebSocket bridge: entry point.
//!
//! Opens one serial connection (an ESP32 over USB) and starts a WebSocket
//! server.  Every client's messages are written to the serial port verbatim,
//! and every chunk the device sends is broadcast to all connected clients as a
//! text message.  Failed writes are reported back to the sender only, as
//! `Error: <cause>`.
//!
//! # Usage
//!
//! ```text
//! serial-ws-bridge [OPTIONS]
//!
//! Options:
//!   --config      <FILE>   Optional TOML config file
//!   --ws-bind     <IP>     WebSocket bind address [default: 0.0.0.0]
//!   --ws-port     <PORT>   WebSocket listener port [default: 8080]
//!   --serial-port <PATH>   Serial device path [default: /dev/ttyUSB0]
//!   --baud-rate   <BAUD>   Serial baud rate [default: 115200]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Description              |
//! |----------------------|--------------------------|
//! | `SERIAL_BRIDGE_CONFIG` | Config file path       |
//! | `SERIAL_WS_BIND`     | WebSocket bind address   |
//! | `SERIAL_WS_PORT`     | WebSocket listener port  |
//! | `SERIAL_PORT`        | Serial device path       |
//! | `SERIAL_BAUD_RATE`   | Serial baud rate         |
//!
//! Precedence: CLI flag / environment variable, then config file, then the
//! built-in default.
//!
//! If the serial device cannot be opened the server still starts; every write
//! a client attempts fails and is reported to that client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_core::load_config_file;
use serial_core::port::open_or_detached;
use serial_ws_bridge::application::spawn_relay;
use serial_ws_bridge::domain::{BridgeConfig, BridgeFileConfig};
use serial_ws_bridge::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-to-WebSocket bridge.
///
/// Relays between WebSocket clients and a serial device.
#[derive(Debug, Parser)]
#[command(
    name = "serial-ws-bridge",
    about = "WebSocket server relaying to and from a serial device",
    version
)]
struct Cli {
    /// Optional TOML config file with `[serial]` and `[server]` sections.
    #[arg(long, env = "SERIAL_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    ///
    /// Use `127.0.0.1` to accept only local connections.
    #[arg(long, env = "SERIAL_WS_BIND")]
    ws_bind: Option<String>,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, env = "SERIAL_WS_PORT")]
    ws_port: Option<u16>,

    /// Serial device path (e.g. `/dev/ttyUSB0`, `/dev/tty.usbserial-XXXX`, `COM3`).
    #[arg(long, env = "SERIAL_PORT")]
    serial_port: Option<String>,

    /// Serial baud rate.  Must match the firmware's UART configuration.
    #[arg(long, env = "SERIAL_BAUD_RATE")]
    baud_rate: Option<u32>,
}

impl Cli {
    /// Merges defaults, the config file (if any) and CLI overrides into a
    /// [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// resulting bind address is not a valid socket address.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut file = match &self.config {
            Some(path) => load_config_file::<BridgeFileConfig>(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => BridgeFileConfig::default(),
        };

        if let Some(bind) = self.ws_bind {
            file.server.bind = bind;
        }
        if let Some(port) = self.ws_port {
            file.server.port = port;
        }
        if let Some(path) = self.serial_port {
            file.serial.port_path = path;
        }
        if let Some(baud) = self.baud_rate {
            file.serial.baud_rate = baud;
        }

        let ws_bind_addr: SocketAddr = file.server.socket_addr().with_context(|| {
            format!(
                "invalid WebSocket bind address: '{}:{}'",
                file.server.bind, file.server.port
            )
        })?;

        Ok(BridgeConfig {
            ws_bind_addr,
            serial: file.serial,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// A current-thread runtime is enough: the relay hub handles one event at a
/// time anyway, and the blocking serial I/O runs on the adapter's own threads.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "serial WebSocket bridge starting — ws={}, serial={} @ {} baud",
        config.ws_bind_addr, config.serial.port_path, config.serial.baud_rate
    );

    // A missing device is not fatal here: clients get write errors instead.
    let (serial, serial_events) = open_or_detached(&config.serial);
    let hub = spawn_relay(Arc::new(serial), serial_events);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(&config, hub, running).await?;

    info!("serial WebSocket bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_defaults_produce_port_8080() {
        // Arrange: no arguments, no config file
        let cli = Cli::parse_from(["serial-ws-bridge"]);

        // Act
        let config = cli.into_bridge_config().unwrap();

        // Assert
        assert_eq!(config.ws_bind_addr.port(), 8080);
    }

    #[test]
    fn test_cli_defaults_produce_115200_baud() {
        let cli = Cli::parse_from(["serial-ws-bridge"]);
        let config = cli.into_bridge_config().unwrap();
        assert_eq!(config.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_cli_ws_port_override() {
        let cli = Cli::parse_from(["serial-ws-bridge", "--ws-port", "9999"]);
        let config = cli.into_bridge_config().unwrap();
        assert_eq!(config.ws_bind_addr.port(), 9999);
    }

    #[test]
    fn test_cli_serial_overrides() {
        let cli = Cli::parse_from([
            "serial-ws-bridge",
            "--serial-port",
            "/dev/tty.usbserial-59170079241",
            "--baud-rate",
            "9600",
        ]);
        let config = cli.into_bridge_config().unwrap();
        assert_eq!(config.serial.port_path, "/dev/tty.usbserial-59170079241");
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        // Arrange: file says 7000, CLI says 7001.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 7000\n[serial]\nport_path = \"/dev/ttyACM0\""
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["serial-ws-bridge", "--config", &path, "--ws-port", "7001"]);

        // Act
        let config = cli.into_bridge_config().unwrap();

        // Assert: CLI wins for the port, the file still supplies the device.
        assert_eq!(config.ws_bind_addr.port(), 7001);
        assert_eq!(config.serial.port_path, "/dev/ttyACM0");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "serial-ws-bridge",
            "--config",
            "/definitely/not/here/bridge.toml",
        ]);
        assert!(cli.into_bridge_config().is_err());
    }

    #[test]
    fn test_invalid_ws_bind_returns_error() {
        let cli = Cli {
            config: None,
            ws_bind: Some("not.an.ip".to_string()),
            ws_port: None,
            serial_port: None,
            baud_rate: None,
        };
        assert!(cli.into_bridge_config().is_err());
    }
}
