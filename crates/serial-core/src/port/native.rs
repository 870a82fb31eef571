//! `serialport`-backed implementation of the adapter.
//!
//! `serialport` exposes a blocking `Read + Write` handle.  We clone it once and
//! give each clone its own OS thread:
//!
//! - **reader**: loops on `read()` with a short timeout and sends every
//!   non-empty chunk as [`SerialEvent::Data`].  A real fault is sent as
//!   [`SerialEvent::Error`] and ends the thread; nothing tries to reopen the
//!   device.
//! - **writer**: drains the request queue, `write_all` + `flush` per request,
//!   and reports each outcome through the request's oneshot.
//!
//! Both threads exit on their own once every handle and the event receiver
//! have been dropped.

use std::io::{ErrorKind, Read, Write};
use std::thread;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    ConnectionError, DeviceError, SerialEvent, SerialEvents, SerialHandle, WriteError,
    WriteRequest,
};
use crate::domain::config::SerialConfig;

/// Opens the configured device (8N1, no flow control) and starts its I/O
/// threads.
///
/// # Errors
///
/// Returns [`ConnectionError`] if the device does not exist, is already
/// claimed, cannot be accessed, or the I/O threads cannot be started.
pub fn open(config: &SerialConfig) -> Result<(SerialHandle, SerialEvents), ConnectionError> {
    let port = serialport::new(&config.port_path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout())
        .open()
        .map_err(|source| ConnectionError::Open {
            path: config.port_path.clone(),
            source,
        })?;

    let writer_port = port.try_clone().map_err(|source| ConnectionError::Clone {
        path: config.port_path.clone(),
        source,
    })?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (request_tx, request_rx) = mpsc::unbounded_channel();

    let chunk_size = config.chunk_size.max(1);
    thread::Builder::new()
        .name("serial-reader".to_string())
        .spawn(move || read_loop(port, event_tx, chunk_size))
        .map_err(ConnectionError::Spawn)?;

    thread::Builder::new()
        .name("serial-writer".to_string())
        .spawn(move || write_loop(writer_port, request_rx))
        .map_err(ConnectionError::Spawn)?;

    info!(
        "serial port {} open at {} baud",
        config.port_path, config.baud_rate
    );

    Ok((SerialHandle::new(request_tx, &config.port_path), event_rx))
}

/// Like [`open`], but falls back to a [detached](SerialHandle::detached)
/// handle when the device cannot be opened.
///
/// The failure is logged at `error` level.  Callers keep running and every
/// write they attempt fails with [`WriteError::NotOpen`].
pub fn open_or_detached(config: &SerialConfig) -> (SerialHandle, SerialEvents) {
    match open(config) {
        Ok(connection) => connection,
        Err(e) => {
            error!("{e}; continuing without a serial connection");
            SerialHandle::detached(&config.port_path)
        }
    }
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    events: mpsc::UnboundedSender<SerialEvent>,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];

    loop {
        match port.read(&mut buf) {
            Ok(0) => {
                warn!("serial device returned end of stream");
                let _ = events.send(SerialEvent::Error(DeviceError::Disconnected));
                break;
            }
            Ok(n) => {
                if events.send(SerialEvent::Data(buf[..n].to_vec())).is_err() {
                    debug!("serial event receiver dropped; stopping reader");
                    break;
                }
            }
            // Idle line.  Use the pause to notice that nobody is listening.
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                if events.is_closed() {
                    debug!("serial event receiver dropped; stopping reader");
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("serial read failed: {e}");
                let _ = events.send(SerialEvent::Error(DeviceError::Io(e)));
                break;
            }
        }
    }
}

fn write_loop(mut port: Box<dyn SerialPort>, mut requests: mpsc::UnboundedReceiver<WriteRequest>) {
    while let Some(request) = requests.blocking_recv() {
        let result = port
            .write_all(&request.bytes)
            .and_then(|()| port.flush())
            .map_err(WriteError::Io);

        if let Err(e) = &result {
            warn!("serial write of {} bytes failed: {e}", request.bytes.len());
        }

        // The caller may have dropped its PendingWrite; that's fine.
        let _ = request.done.send(result);
    }
    debug!("all serial handles dropped; stopping writer");
}
