//! serial-ws-bridge library crate.
//!
//! This crate provides a WebSocket server that relays between any number of
//! WebSocket clients and a single serial device.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! WebSocket clients (opaque text frames)
//!         ↕
//! [serial-ws-bridge]
//!   ├── domain/           Pure types: ClientId, OutboundMessage, BridgeConfig
//!   ├── application/      RelayHub: client registry + broadcast dispatcher
//!   └── infrastructure/
//!         └── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         ↕
//! serial-core (serial port adapter)
//!         ↕
//! ESP32 over USB serial
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `serial-core`; it talks to the
//!   outside world only through channels.
//! - `infrastructure` owns sockets and depends on everything else.
//!
//! # Event model
//!
//! All shared state (the set of connected clients and the serial writer) is
//! owned by one [`application::RelayHub`] task.  Session tasks and the serial
//! adapter never touch it directly; they send [`application::BridgeEvent`]s
//! into the hub's channel and the hub handles them one at a time, in arrival
//! order.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: the relay dispatcher.
pub mod application;

/// Infrastructure layer: WebSocket server.
pub mod infrastructure;
