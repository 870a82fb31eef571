//! # serial-core
//!
//! Shared library for the serial bridges.  It owns everything that touches the
//! serial device and nothing that touches a front-end (WebSocket or console).
//!
//! # Architecture overview
//!
//! Both bridge binaries talk to exactly one serial device, usually an ESP32
//! attached over USB.  The device is a raw byte stream: there is no framing and
//! chunk boundaries mean nothing.  This crate turns that stream into two
//! async-friendly halves:
//!
//! - **`port`** – The serial port adapter.  [`port::open`] claims the device and
//!   returns a [`SerialHandle`] (the write sink) plus a [`SerialEvents`]
//!   receiver (inbound data chunks and device faults).  The `serialport` crate
//!   is blocking, so the adapter runs one reader thread and one writer thread
//!   and bridges them to Tokio with channels.
//!
//! - **`domain`** – Plain configuration types with serde defaults, loadable from
//!   a TOML file.
//!
//! The [`SerialWriter`] trait is the seam the bridges are written against, so
//! tests can substitute [`port::mock::MockSerialPort`] for real hardware.

pub mod domain;
pub mod port;

pub use domain::config::{
    load_config_file, ConfigError, SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT_PATH,
};
pub use port::error::{ConnectionError, DeviceError, WriteError};
pub use port::{PendingWrite, SerialEvent, SerialEvents, SerialHandle, SerialWriter};
