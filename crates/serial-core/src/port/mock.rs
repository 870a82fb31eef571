//! In-memory serial port for tests.
//!
//! [`MockSerialPort`] records every submitted write and lets a test play the
//! device: inject inbound chunks, report faults, fail writes, or hold writes
//! pending until the test releases them.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use super::{DeviceError, PendingWrite, SerialEvent, SerialEvents, SerialWriter, WriteError};

/// How the mock answers writes.
#[derive(Debug, Clone, Default)]
enum WriteMode {
    #[default]
    Succeed,
    Fail(String),
    Hold,
}

#[derive(Debug, Default)]
struct MockState {
    writes: Vec<Vec<u8>>,
    mode: WriteMode,
    held: Vec<oneshot::Sender<Result<(), WriteError>>>,
}

/// A fake serial device.  Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockState>>,
    events: mpsc::UnboundedSender<SerialEvent>,
}

impl MockSerialPort {
    /// Creates the mock together with the event stream it feeds.
    pub fn new() -> (Self, SerialEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let port = Self {
            state: Arc::new(Mutex::new(MockState::default())),
            events,
        };
        (port, rx)
    }

    /// Every write submitted so far, in submission order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().expect("lock poisoned").writes.clone()
    }

    /// Subsequent writes fail with an I/O error carrying `reason`.
    pub fn fail_writes(&self, reason: &str) {
        self.state.lock().expect("lock poisoned").mode = WriteMode::Fail(reason.to_string());
    }

    /// Subsequent writes succeed immediately (the default).
    pub fn succeed_writes(&self) {
        self.state.lock().expect("lock poisoned").mode = WriteMode::Succeed;
    }

    /// Subsequent writes stay pending until [`release_writes`](Self::release_writes).
    pub fn hold_writes(&self) {
        self.state.lock().expect("lock poisoned").mode = WriteMode::Hold;
    }

    /// Completes every held write successfully and returns how many there were.
    pub fn release_writes(&self) -> usize {
        let held = std::mem::take(&mut self.state.lock().expect("lock poisoned").held);
        let count = held.len();
        for done in held {
            let _ = done.send(Ok(()));
        }
        count
    }

    /// Number of writes currently held pending.
    pub fn held_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").held.len()
    }

    /// Delivers `bytes` as if the device had sent them.
    ///
    /// Panics if the event receiver has been dropped.
    pub fn emit(&self, bytes: &[u8]) {
        self.events
            .send(SerialEvent::Data(bytes.to_vec()))
            .expect("serial event receiver has been dropped");
    }

    /// Reports a device fault.
    ///
    /// Panics if the event receiver has been dropped.
    pub fn emit_error(&self, error: DeviceError) {
        self.events
            .send(SerialEvent::Error(error))
            .expect("serial event receiver has been dropped");
    }
}

impl SerialWriter for MockSerialPort {
    fn submit(&self, bytes: Vec<u8>) -> PendingWrite {
        let mut state = self.state.lock().expect("lock poisoned");
        state.writes.push(bytes);
        match state.mode.clone() {
            WriteMode::Succeed => PendingWrite::ready(Ok(())),
            WriteMode::Fail(reason) => PendingWrite::ready(Err(WriteError::Io(
                std::io::Error::other(reason),
            ))),
            WriteMode::Hold => {
                let (done, rx) = oneshot::channel();
                state.held.push(done);
                PendingWrite::waiting(rx)
            }
        }
    }

    fn is_open(&self) -> bool {
        true
    }
}
