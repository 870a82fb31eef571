//! Error taxonomy for the serial adapter.

use thiserror::Error;

/// The serial device could not be opened.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The OS refused to open the device (missing path, busy, permissions).
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The port handle could not be duplicated for the writer thread.
    #[error("failed to clone serial port handle for {path}: {source}")]
    Clone {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// An adapter I/O thread could not be started.
    #[error("failed to spawn serial I/O thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A write to the serial device failed.
#[derive(Debug, Error)]
pub enum WriteError {
    /// There is no open serial connection.
    #[error("serial port is not open")]
    NotOpen,

    /// The device rejected or aborted the write.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The adapter stopped before the write completed.
    #[error("serial writer has shut down")]
    Closed,
}

/// An asynchronous fault reported by the device itself.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A read failed.
    #[error("serial read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped delivering data (end of stream).
    #[error("serial device disconnected")]
    Disconnected,
}
