//! Application layer for serial-ws-bridge.
//!
//! # Responsibilities
//!
//! - Keeping the registry of connected clients
//! - Forwarding client payloads to the serial writer
//! - Broadcasting serial chunks to every registered client
//! - Routing write failures back to the originating client only
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or accepting connections (infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite)
//! - Opening the serial device (serial-core)

pub mod relay_hub;

pub use relay_hub::{spawn_relay, BridgeEvent, BridgeEventSender, RelayHub};
