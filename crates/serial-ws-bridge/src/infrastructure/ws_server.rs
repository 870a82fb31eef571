//! WebSocket server: accept loop and per-client session tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Registering the session with the relay hub and running two directions
//!    concurrently until either ends:
//!    - **Client → Hub**: every text or binary frame becomes a
//!      `ClientMessage` carrying the frame's bytes.
//!    - **Hub → Client**: every queued [`OutboundMessage`] becomes one text
//!      frame.
//! 5. Deregistering the session, whatever the reason it ended.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! Sessions never see each other or the serial device; all routing decisions
//! are made by the hub.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::{BridgeEvent, BridgeEventSender};
use crate::domain::config::BridgeConfig;
use crate::domain::messages::{ClientId, OutboundMessage};

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.ws_bind_addr` and runs [`serve`] until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (port in use, no
/// permission).
pub async fn run_server(
    config: &BridgeConfig,
    hub: BridgeEventSender,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("WebSocket server is running on ws://{}", config.ws_bind_addr);

    serve(listener, hub, running).await
}

/// Accepts WebSocket clients on `listener` until `running` is set to `false`.
///
/// Each accepted connection is handed to its own task so one slow client never
/// blocks the accept loop.
pub async fn serve(
    listener: TcpListener,
    hub: BridgeEventSender,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Bounded wait so the flag is re-checked even with no clients arriving.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("TCP connection from {peer_addr}");
                let hub = hub.clone();
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, hub).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. too many open files).  Keep listening.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Runs [`run_session`] and logs how it ended.
async fn handle_client_session(stream: TcpStream, peer_addr: SocketAddr, hub: BridgeEventSender) {
    match run_session(stream, peer_addr, hub).await {
        Ok(()) => debug!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Complete lifecycle of one WebSocket client.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the hub has shut
/// down.  Errors after registration are treated as a disconnect.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: BridgeEventSender,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let client_id = ClientId::new();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    hub.send(BridgeEvent::ClientConnected {
        client_id,
        outbound: outbound_tx,
    })
    .map_err(|_| anyhow::anyhow!("relay hub has shut down"))?;

    info!("client {client_id} connected from {peer_addr}");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Hub → client.  Ends when the hub drops our queue or the socket fails.
    let to_client = async {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = ws_tx.send(WsMessage::Text(msg.into_text())).await {
                debug!("client {client_id}: WebSocket send failed: {e}");
                break;
            }
        }
    };

    // Client → hub.  Ends on close, error, or end of stream.
    let from_client = async {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("client {client_id}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    debug!("client {client_id}: WebSocket error: {e}");
                    break;
                }
                None => break,
            };

            match classify_frame(ws_msg) {
                FrameAction::Forward(payload) => {
                    if hub
                        .send(BridgeEvent::ClientMessage { client_id, payload })
                        .is_err()
                    {
                        break;
                    }
                }
                FrameAction::Close => break,
                FrameAction::Ignore => {}
            }
        }
    };

    tokio::select! {
        _ = to_client => debug!("client {client_id}: outbound direction ended"),
        _ = from_client => debug!("client {client_id}: inbound direction ended"),
    }

    // Clean close and transport failure look the same to the hub.
    let _ = hub.send(BridgeEvent::ClientDisconnected { client_id });
    info!("client {client_id} disconnected");

    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// What to do with one inbound WebSocket frame.
#[derive(Debug, PartialEq, Eq)]
enum FrameAction {
    /// Relay these bytes to the serial device.
    Forward(Vec<u8>),
    /// The client asked to close.
    Close,
    /// Control traffic answered by tungstenite itself.
    Ignore,
}

fn classify_frame(msg: WsMessage) -> FrameAction {
    match msg {
        WsMessage::Text(text) => FrameAction::Forward(text.into_bytes()),
        WsMessage::Binary(bytes) => FrameAction::Forward(bytes),
        WsMessage::Close(_) => FrameAction::Close,
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => FrameAction::Ignore,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_frame_forwards_utf8_bytes() {
        let action = classify_frame(WsMessage::Text("LED_ON".to_string()));
        assert_eq!(action, FrameAction::Forward(b"LED_ON".to_vec()));
    }

    #[test]
    fn test_binary_frame_forwards_raw_bytes() {
        let action = classify_frame(WsMessage::Binary(vec![0x00, 0xFF]));
        assert_eq!(action, FrameAction::Forward(vec![0x00, 0xFF]));
    }

    #[test]
    fn test_empty_text_frame_is_still_forwarded() {
        let action = classify_frame(WsMessage::Text(String::new()));
        assert_eq!(action, FrameAction::Forward(Vec::new()));
    }

    #[test]
    fn test_close_frame_closes() {
        assert_eq!(classify_frame(WsMessage::Close(None)), FrameAction::Close);
    }

    #[test]
    fn test_ping_and_pong_are_ignored() {
        assert_eq!(classify_frame(WsMessage::Ping(vec![1])), FrameAction::Ignore);
        assert_eq!(classify_frame(WsMessage::Pong(vec![1])), FrameAction::Ignore);
    }

    #[tokio::test]
    async fn test_serve_stops_when_running_flag_cleared() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (hub, _rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(false));

        // Act: the flag is already cleared, so serve returns promptly.
        let result = timeout(Duration::from_secs(2), serve(listener, hub, running)).await;

        // Assert
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_run_server_reports_bind_failure() {
        // Arrange: occupy a port, then ask the server to bind the same one.
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = BridgeConfig {
            ws_bind_addr: taken.local_addr().unwrap(),
            ..BridgeConfig::default()
        };
        let (hub, _rx) = mpsc::unbounded_channel();

        // Act
        let result = run_server(&config, hub, Arc::new(AtomicBool::new(true))).await;

        // Assert
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("failed to bind WebSocket listener"));
    }
}
