//! Infrastructure layer for serial-ws-bridge.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for WebSocket clients
//! - Performing the WebSocket HTTP upgrade handshake
//! - Spawning one session task per client that turns socket frames into
//!   [`crate::application::BridgeEvent`]s and drains the client's outbound queue
//! - Handling the graceful shutdown signal
//!
//! Opening the serial device lives in `serial-core`; configuration parsing is
//! done in `main.rs`.

pub mod ws_server;

pub use ws_server::{run_server, serve};
