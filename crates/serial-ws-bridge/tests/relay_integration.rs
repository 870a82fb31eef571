//! End-to-end tests for the WebSocket relay.
//!
//! # Purpose
//!
//! These tests run the real accept loop on an ephemeral localhost port and
//! talk to it with real `tokio-tungstenite` clients.  Only the serial device
//! is faked, with `MockSerialPort`.  They verify:
//!
//! - Client frames reach the serial device verbatim.
//! - Serial chunks reach every connected client as one text frame each.
//! - Write failures are visible only to the client that caused them.
//! - Disconnected clients stop receiving broadcasts without affecting others.
//!
//! # Synchronisation
//!
//! Registration happens asynchronously inside the hub.  Before emitting
//! serial data, each test has every client send a probe frame and waits until
//! the mock has recorded it.  A session registers before it reads any frame,
//! so a recorded probe proves the client is in the registry.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use serial_core::port::mock::MockSerialPort;
use serial_ws_bridge::application::spawn_relay;
use serial_ws_bridge::infrastructure::serve;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Starts a bridge on `127.0.0.1:0` backed by a fresh mock serial port.
async fn start_bridge() -> (SocketAddr, MockSerialPort) {
    let (serial, serial_events) = MockSerialPort::new();
    let hub = spawn_relay(Arc::new(serial.clone()), serial_events);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(serve(listener, hub, Arc::new(AtomicBool::new(true))));

    (addr, serial)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _response) = connect_async(format!("ws://{addr}"))
        .await
        .expect("WebSocket connect");
    ws
}

/// Polls until the mock has recorded `count` writes.
async fn wait_for_writes(serial: &MockSerialPort, count: usize) {
    timeout(WAIT, async {
        while serial.writes().len() < count {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for serial writes");
}

/// Reads the next text frame, skipping control frames.
async fn next_text(ws: &mut Client) -> String {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a text frame")
}

/// Asserts nothing arrives within a short grace period.
async fn assert_silent(ws: &mut Client) {
    let result = timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

#[tokio::test]
async fn test_client_text_reaches_serial_verbatim_without_reply() {
    // Arrange
    let (addr, serial) = start_bridge().await;
    let mut ws = connect(addr).await;

    // Act
    ws.send(Message::Text("LED_ON".to_string())).await.unwrap();
    wait_for_writes(&serial, 1).await;

    // Assert: device got the exact bytes; success is silent.
    assert_eq!(serial.writes(), vec![b"LED_ON".to_vec()]);
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn test_serial_chunk_is_broadcast_to_all_clients() {
    // Arrange
    let (addr, serial) = start_bridge().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    a.send(Message::Text("probe-a".to_string())).await.unwrap();
    b.send(Message::Text("probe-b".to_string())).await.unwrap();
    wait_for_writes(&serial, 2).await;

    // Act
    serial.emit(b"OK\n");

    // Assert
    assert_eq!(next_text(&mut a).await, "OK\n");
    assert_eq!(next_text(&mut b).await, "OK\n");
}

#[tokio::test]
async fn test_write_failure_is_only_visible_to_sender() {
    // Arrange
    let (addr, serial) = start_bridge().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    b.send(Message::Text("probe-b".to_string())).await.unwrap();
    wait_for_writes(&serial, 1).await;
    serial.fail_writes("Port is not open");

    // Act
    a.send(Message::Text("PUMP_ON".to_string())).await.unwrap();

    // Assert: A gets the error, B does not.
    assert_eq!(next_text(&mut a).await, "Error: Port is not open");
    assert_silent(&mut b).await;

    // Both keep receiving serial data afterwards.
    serial.emit(b"T:22.75");
    assert_eq!(next_text(&mut a).await, "T:22.75");
    assert_eq!(next_text(&mut b).await, "T:22.75");
}

#[tokio::test]
async fn test_disconnected_client_does_not_affect_others() {
    // Arrange
    let (addr, serial) = start_bridge().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    a.send(Message::Text("probe-a".to_string())).await.unwrap();
    b.send(Message::Text("probe-b".to_string())).await.unwrap();
    wait_for_writes(&serial, 2).await;

    // Act
    a.close(None).await.unwrap();
    drop(a);
    serial.emit(b"WL: HIGH;");

    // Assert
    assert_eq!(next_text(&mut b).await, "WL: HIGH;");

    // B can still write.
    b.send(Message::Text("STATUS".to_string())).await.unwrap();
    wait_for_writes(&serial, 3).await;
    assert_eq!(serial.writes()[2], b"STATUS".to_vec());
}

#[tokio::test]
async fn test_binary_frame_reaches_serial_verbatim() {
    let (addr, serial) = start_bridge().await;
    let mut ws = connect(addr).await;
    let payload = vec![0x01, 0x00, 0xFE, b'\n'];

    ws.send(Message::Binary(payload.clone())).await.unwrap();
    wait_for_writes(&serial, 1).await;

    assert_eq!(serial.writes(), vec![payload]);
}
