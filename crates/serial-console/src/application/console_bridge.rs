//! The console relay loop.
//!
//! One task multiplexes three sources with `tokio::select!`:
//!
//! - **input lines** – read only while no write is pending, so the operator
//!   sees strict request/response pacing: type a line, the line is written,
//!   the prompt comes back.
//! - **the pending write** – when it settles (either way) the outcome is
//!   reported and the prompt is shown again.
//! - **serial events** – printed the moment they arrive, even mid-prompt.
//!   Interleaving with the prompt is accepted.
//!
//! End of input ends the loop.  A write still in flight at that point is
//! abandoned; the device may or may not have received it.

use std::sync::Arc;

use serial_core::{PendingWrite, SerialEvent, SerialEvents, SerialWriter, WriteError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// Text shown when the console is ready for the next line.
pub const PROMPT: &str = "> ";

/// Runs the prompt until `input` reaches end of file.
///
/// Each line (without its line terminator) is written to `serial`.  Every
/// chunk from `serial_events` is written to `output` verbatim (lossy UTF-8).
///
/// # Errors
///
/// Returns an error only if reading `input` or writing `output` fails.  Serial
/// failures are reported on `output` and logged, never returned.
pub async fn run_console<R, W>(
    input: R,
    mut output: W,
    serial: Arc<dyn SerialWriter>,
    mut serial_events: SerialEvents,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut pending: Option<PendingWrite> = None;
    let mut serial_live = true;

    print(&mut output, PROMPT).await?;

    loop {
        tokio::select! {
            line = lines.next_line(), if pending.is_none() => {
                let Some(line) = line? else {
                    debug!("end of input");
                    break;
                };
                info!("Sending to ESP32: {line}");
                pending = Some(serial.submit(line.into_bytes()));
            }

            result = settle(&mut pending), if pending.is_some() => {
                pending = None;
                match result {
                    Ok(()) => debug!("write to serial port completed"),
                    Err(e) => {
                        error!("error writing to serial port: {e}");
                        print(&mut output, &format!("Error writing to serial port: {e}\n")).await?;
                    }
                }
                print(&mut output, PROMPT).await?;
            }

            event = serial_events.recv(), if serial_live => match event {
                Some(SerialEvent::Data(bytes)) => {
                    print(&mut output, &String::from_utf8_lossy(&bytes)).await?;
                }
                Some(SerialEvent::Error(e)) => error!("serial device error: {e}"),
                None => {
                    debug!("serial event stream ended");
                    serial_live = false;
                }
            },
        }
    }

    output.flush().await
}

async fn settle(pending: &mut Option<PendingWrite>) -> Result<(), WriteError> {
    match pending {
        Some(write) => write.await,
        None => std::future::pending().await,
    }
}

async fn print<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
