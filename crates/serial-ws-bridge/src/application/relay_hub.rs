//! The relay dispatcher.
//!
//! [`RelayHub`] is the only owner of the client registry and the serial writer.
//! Everything else communicates with it by sending [`BridgeEvent`]s into its
//! channel; [`RelayHub::run`] drains that channel and handles each event to
//! completion before looking at the next one.
//!
//! ```text
//!  session tasks ──ClientConnected / ClientMessage / ClientDisconnected──┐
//!  serial pump   ──Serial(Data | Error)──────────────────────────────────┤
//!  write waiters ──WriteCompleted────────────────────────────────────────┤
//!                                                                        ▼
//!                                                                   RelayHub
//!                                     ┌──── submit(bytes) ──► SerialWriter
//!                                     └──── OutboundMessage ──► per-client queue
//! ```
//!
//! Serial writes complete asynchronously.  The hub submits the write (which
//! fixes its position in the device's FIFO), then hands the completion to a
//! short-lived task that posts [`BridgeEvent::WriteCompleted`] back into the
//! same channel.  The hub therefore never waits on the device.

use std::collections::HashMap;
use std::sync::Arc;

use serial_core::{SerialEvent, SerialEvents, SerialWriter, WriteError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::messages::{decode_chunk, ClientId, OutboundMessage};

/// Everything the hub reacts to.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A WebSocket handshake completed.  `outbound` is the client's send queue.
    ClientConnected {
        client_id: ClientId,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
    },
    /// A client sent a text or binary frame.
    ClientMessage {
        client_id: ClientId,
        payload: Vec<u8>,
    },
    /// A client closed, errored, or its socket went away.
    ClientDisconnected { client_id: ClientId },
    /// The serial adapter produced a chunk or a fault.
    Serial(SerialEvent),
    /// A write submitted on behalf of `client_id` finished.
    WriteCompleted {
        client_id: ClientId,
        len: usize,
        result: Result<(), WriteError>,
    },
}

/// Sending side of the hub's event channel.
pub type BridgeEventSender = mpsc::UnboundedSender<BridgeEvent>;

/// Client registry plus the shared serial writer.
pub struct RelayHub {
    serial: Arc<dyn SerialWriter>,
    clients: HashMap<ClientId, mpsc::UnboundedSender<OutboundMessage>>,
    events: BridgeEventSender,
}

impl RelayHub {
    /// Creates a hub and returns it together with its event receiver.
    pub fn new(serial: Arc<dyn SerialWriter>) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let hub = Self {
            serial,
            clients: HashMap::new(),
            events,
        };
        (hub, rx)
    }

    /// A sender for feeding events to this hub.
    pub fn sender(&self) -> BridgeEventSender {
        self.events.clone()
    }

    /// Number of currently registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// `true` if `client_id` is registered.
    pub fn is_registered(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Processes events until the channel closes.
    ///
    /// The hub keeps a sender of its own, so in practice this runs until the
    /// runtime shuts down.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<BridgeEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        debug!("relay hub event channel closed");
    }

    /// Handles a single event.
    ///
    /// Must be called from within a Tokio runtime: client messages spawn a
    /// task that waits for the serial write to complete.
    pub fn handle(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::ClientConnected {
                client_id,
                outbound,
            } => {
                self.clients.insert(client_id, outbound);
                info!(
                    "new client connected: {client_id} ({} total)",
                    self.clients.len()
                );
            }

            BridgeEvent::ClientDisconnected { client_id } => {
                if self.clients.remove(&client_id).is_some() {
                    info!(
                        "client disconnected: {client_id} ({} remaining)",
                        self.clients.len()
                    );
                }
            }

            BridgeEvent::ClientMessage { client_id, payload } => {
                self.forward_to_serial(client_id, payload);
            }

            BridgeEvent::WriteCompleted {
                client_id,
                len,
                result,
            } => self.finish_write(client_id, len, result),

            BridgeEvent::Serial(SerialEvent::Data(bytes)) => self.broadcast(&bytes),

            BridgeEvent::Serial(SerialEvent::Error(e)) => {
                // No reconnect: the device is assumed stable for the process
                // lifetime.  Clients stay connected and simply stop receiving.
                error!("serial device error: {e}");
            }
        }
    }

    fn forward_to_serial(&self, client_id: ClientId, payload: Vec<u8>) {
        info!(
            "received from client {client_id}: {}",
            String::from_utf8_lossy(&payload)
        );

        let len = payload.len();
        let pending = self.serial.submit(payload);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = pending.await;
            // Only fails if the hub itself is gone.
            let _ = events.send(BridgeEvent::WriteCompleted {
                client_id,
                len,
                result,
            });
        });
    }

    fn finish_write(&self, client_id: ClientId, len: usize, result: Result<(), WriteError>) {
        match result {
            Ok(()) => debug!("client {client_id}: sent {len} bytes to serial port"),
            Err(e) => {
                error!("client {client_id}: error writing to serial port: {e}");
                // Only the originator hears about it.  It may have left already.
                match self.clients.get(&client_id) {
                    Some(outbound) => {
                        let _ = outbound.send(OutboundMessage::WriteFailed(e.to_string()));
                    }
                    None => debug!("client {client_id} gone before its write failed"),
                }
            }
        }
    }

    fn broadcast(&self, bytes: &[u8]) {
        let text = decode_chunk(bytes);
        info!("received from serial port: {text}");

        for (client_id, outbound) in &self.clients {
            if outbound
                .send(OutboundMessage::SerialData(text.clone()))
                .is_err()
            {
                // The session task has exited; its ClientDisconnected is queued.
                debug!("client {client_id}: outbound queue closed");
            }
        }
    }
}

/// Pumps serial adapter events into the hub until the adapter stops.
pub async fn forward_serial_events(mut serial_events: SerialEvents, hub: BridgeEventSender) {
    while let Some(event) = serial_events.recv().await {
        if hub.send(BridgeEvent::Serial(event)).is_err() {
            return;
        }
    }
    warn!("serial event stream ended; no further device data will be relayed");
}

/// Starts the hub and the serial pump on the current runtime.
///
/// Returns the sender that session tasks use to talk to the hub.
pub fn spawn_relay(serial: Arc<dyn SerialWriter>, serial_events: SerialEvents) -> BridgeEventSender {
    let (hub, rx) = RelayHub::new(serial);
    let sender = hub.sender();
    tokio::spawn(forward_serial_events(serial_events, sender.clone()));
    tokio::spawn(hub.run(rx));
    sender
}

// ── Tests ─────────────────────────────────────────────────────────────────────
