//! Application layer for serial-console.

pub mod console_bridge;

pub use console_bridge::{run_console, PROMPT};
