//! serial-console library crate.
//!
//! An interactive prompt for talking to a serial device by hand.  Each line
//! typed at the prompt is written to the device; everything the device sends
//! is printed as it arrives.
//!
//! ```text
//! stdin ──line──► [console loop] ──bytes──► serial-core ──► ESP32
//! stdout ◄─chunk── [console loop] ◄─chunk── serial-core ◄── ESP32
//! ```
//!
//! The loop itself is generic over its input and output streams so it can be
//! driven from tests without a terminal.

/// Application layer: the console relay loop.
pub mod application;
