//! Serial port adapter.
//!
//! The device is modelled as two halves:
//!
//! ```text
//!                 submit(bytes) ──► writer thread ──► device
//!  SerialHandle ◄─ PendingWrite ◄── completion
//!
//!  SerialEvents ◄── reader thread ◄── device
//!                  (Data chunks, Error)
//! ```
//!
//! Writes are enqueued synchronously by [`SerialWriter::submit`], so two
//! submissions from the same caller reach the device in submission order.  The
//! returned [`PendingWrite`] resolves once the writer thread has finished the
//! write (or failed it).
//!
//! # Testability
//!
//! Bridges hold an `Arc<dyn SerialWriter>` rather than a concrete handle.
//! Tests use [`mock::MockSerialPort`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

pub mod error;
pub mod mock;
mod native;

pub use error::{ConnectionError, DeviceError, WriteError};
pub use native::{open, open_or_detached};

/// Something that happened on the device side.
#[derive(Debug)]
pub enum SerialEvent {
    /// The device delivered a chunk of bytes.  Boundaries are arbitrary.
    Data(Vec<u8>),
    /// The device reported a fault.  The adapter stops reading afterwards.
    Error(DeviceError),
}

/// Inbound event stream of one serial connection.
///
/// Yields `None` once the adapter has stopped reading (after a device fault,
/// or immediately for a detached handle).
pub type SerialEvents = mpsc::UnboundedReceiver<SerialEvent>;

/// Write sink for a serial connection.
pub trait SerialWriter: Send + Sync {
    /// Enqueues `bytes` for transmission and returns its completion.
    fn submit(&self, bytes: Vec<u8>) -> PendingWrite;

    /// `false` when this writer has no device behind it.
    fn is_open(&self) -> bool;
}

/// Completion of a submitted write.
///
/// Resolves to `Ok(())` after the bytes were handed to the device, or to the
/// [`WriteError`] that prevented it.  Dropping it does not cancel the write.
#[derive(Debug)]
pub struct PendingWrite {
    state: PendingState,
}

#[derive(Debug)]
enum PendingState {
    Waiting(oneshot::Receiver<Result<(), WriteError>>),
    Ready(Option<Result<(), WriteError>>),
}

impl PendingWrite {
    /// A write that is waiting on `rx` for its outcome.
    pub fn waiting(rx: oneshot::Receiver<Result<(), WriteError>>) -> Self {
        Self {
            state: PendingState::Waiting(rx),
        }
    }

    /// A write whose outcome is already known.
    pub fn ready(result: Result<(), WriteError>) -> Self {
        Self {
            state: PendingState::Ready(Some(result)),
        }
    }
}

impl Future for PendingWrite {
    type Output = Result<(), WriteError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            // A dropped sender means the writer went away mid-write.
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|outcome| outcome.unwrap_or(Err(WriteError::Closed))),
            PendingState::Ready(slot) => Poll::Ready(slot.take().unwrap_or(Err(WriteError::Closed))),
        }
    }
}

/// One queued write, consumed by the writer thread.
#[derive(Debug)]
pub(crate) struct WriteRequest {
    pub(crate) bytes: Vec<u8>,
    pub(crate) done: oneshot::Sender<Result<(), WriteError>>,
}

/// Cloneable write handle for an open (or detached) serial connection.
#[derive(Debug, Clone)]
pub struct SerialHandle {
    requests: Option<mpsc::UnboundedSender<WriteRequest>>,
    port_path: Arc<str>,
}

impl SerialHandle {
    pub(crate) fn new(requests: mpsc::UnboundedSender<WriteRequest>, port_path: &str) -> Self {
        Self {
            requests: Some(requests),
            port_path: Arc::from(port_path),
        }
    }

    /// A handle with no device behind it.
    ///
    /// Every write fails immediately with [`WriteError::NotOpen`] and the
    /// returned event stream is already closed.  Used when [`open`] fails but
    /// the front-end should keep running.
    pub fn detached(port_path: &str) -> (Self, SerialEvents) {
        let (_tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            requests: None,
            port_path: Arc::from(port_path),
        };
        (handle, rx)
    }

    /// The device path this handle was opened for.
    pub fn port_path(&self) -> &str {
        &self.port_path
    }
}

impl SerialWriter for SerialHandle {
    fn submit(&self, bytes: Vec<u8>) -> PendingWrite {
        let Some(requests) = &self.requests else {
            return PendingWrite::ready(Err(WriteError::NotOpen));
        };
        let (done, rx) = oneshot::channel();
        match requests.send(WriteRequest { bytes, done }) {
            Ok(()) => PendingWrite::waiting(rx),
            Err(_) => PendingWrite::ready(Err(WriteError::Closed)),
        }
    }

    fn is_open(&self) -> bool {
        self.requests
            .as_ref()
            .is_some_and(|requests| !requests.is_closed())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
