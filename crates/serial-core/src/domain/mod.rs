//! Domain types for the serial adapter.
//!
//! Nothing in here performs I/O except [`config::load_config_file`], which
//! reads a single file at startup.

pub mod config;

pub use config::SerialConfig;
