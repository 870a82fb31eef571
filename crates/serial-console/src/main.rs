//! Serial-to-console bridge: entry point.
//!
//! Opens one serial connection and shows a `> ` prompt.  Each line typed is
//! written to the device; everything the device sends is printed as it
//! arrives.  Closing the input (Ctrl+D) exits with status 0.
//!
//! Logs go to stderr so they do not mix into the prompt on stdout; set
//! `RUST_LOG=debug` to see write completions.
//!
//! # Usage
//!
//! ```text
//! serial-console [OPTIONS]
//!
//! Options:
//!   --config      <FILE>   Optional TOML config file ([serial] section)
//!   --serial-port <PATH>   Serial device path [default: /dev/ttyUSB0]
//!   --baud-rate   <BAUD>   Serial baud rate [default: 115200]
//! ```
//!
//! If the device cannot be opened the error is reported and the prompt still
//! runs; every line then fails with "serial port is not open".

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_console::application::run_console;
use serial_core::port::open_or_detached;
use serial_core::{load_config_file, SerialConfig};

/// Serial-to-console bridge.
#[derive(Debug, Parser)]
#[command(
    name = "serial-console",
    about = "Interactive prompt relaying to and from a serial device",
    version
)]
struct Cli {
    /// Optional TOML config file with a `[serial]` section.
    #[arg(long, env = "SERIAL_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device path (e.g. `/dev/ttyUSB0`, `/dev/tty.usbserial-XXXX`, `COM3`).
    #[arg(long, env = "SERIAL_PORT")]
    serial_port: Option<String>,

    /// Serial baud rate.  Must match the firmware's UART configuration.
    #[arg(long, env = "SERIAL_BAUD_RATE")]
    baud_rate: Option<u32>,
}

/// Schema of the optional config file.  Unknown sections (e.g. the WebSocket
/// bridge's `[server]`) are ignored so both binaries can share one file.
#[derive(Debug, Default, Deserialize)]
struct ConsoleFileConfig {
    #[serde(default)]
    serial: SerialConfig,
}

impl Cli {
    /// Merges defaults, the config file (if any) and CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    fn into_serial_config(self) -> anyhow::Result<SerialConfig> {
        let mut serial = match &self.config {
            Some(path) => {
                load_config_file::<ConsoleFileConfig>(path)
                    .with_context(|| format!("failed to load config file {}", path.display()))?
                    .serial
            }
            None => SerialConfig::default(),
        };

        if let Some(path) = self.serial_port {
            serial.port_path = path;
        }
        if let Some(baud) = self.baud_rate {
            serial.baud_rate = baud;
        }
        Ok(serial)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_serial_config()?;
    info!(
        "serial console starting — serial={} @ {} baud",
        config.port_path, config.baud_rate
    );

    let (serial, serial_events) = open_or_detached(&config);

    run_console(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        Arc::new(serial),
        serial_events,
    )
    .await
    .context("console I/O failed")?;

    info!("input closed; exiting");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::parse_from(["serial-console"])
            .into_serial_config()
            .unwrap();
        assert_eq!(config, SerialConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Cli::parse_from([
            "serial-console",
            "--serial-port",
            "COM3",
            "--baud-rate",
            "57600",
        ])
        .into_serial_config()
        .unwrap();
        assert_eq!(config.port_path, "COM3");
        assert_eq!(config.baud_rate, 57600);
    }

    #[test]
    fn test_shared_config_file_ignores_server_section() {
        // Arrange: a file written for the WebSocket bridge.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[serial]\nport_path = \"/dev/ttyACM1\"\n\n[server]\nport = 8080"
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        // Act
        let config = Cli::parse_from(["serial-console", "--config", &path])
            .into_serial_config()
            .unwrap();

        // Assert
        assert_eq!(config.port_path, "/dev/ttyACM1");
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_cli_wins_over_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nbaud_rate = 9600").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = Cli::parse_from(["serial-console", "--config", &path, "--baud-rate", "115200"])
            .into_serial_config()
            .unwrap();

        assert_eq!(config.baud_rate, 115_200);
    }
}
