//! # vigil-observability
//!
//! Logging initialization for the proctoring client.
//!
//! The telemetry core only ever emits `tracing` events; this crate wires a
//! subscriber so embedding applications get consistent output without each
//! binary re-implementing filter plumbing.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod init;

pub use init::init_logging;
