//! Client error types.
//!
//! Only session-start failures ever reach the embedding UI as errors;
//! transport and protocol problems are absorbed by the channel state machine
//! and show up as connection state instead.

use thiserror::Error;

/// Errors surfaced by the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session-start REST call failed; proctoring cannot begin.
    #[error("session start failed: {0}")]
    SessionStart(String),

    /// HTTP transport failure on the session REST endpoints.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The camera collaborator failed to produce a frame.
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// Transport-layer failure escaping the driver (never the channel).
    #[error("transport failure: {0}")]
    Network(#[from] vigil_io::NetworkError),
}
