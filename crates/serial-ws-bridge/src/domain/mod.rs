//! Domain layer for serial-ws-bridge.
//!
//! Pure types with no dependencies on I/O, networking, or async runtimes.
//!
//! # What belongs here?
//!
//! - Client identity
//! - The messages the bridge sends to clients and their wire text
//! - Configuration structures
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - Opening the serial device

pub mod config;
pub mod messages;

pub use config::{BridgeConfig, BridgeFileConfig, ServerSection};
pub use messages::{decode_chunk, ClientId, OutboundMessage};
