//! Transport error types.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors produced by the WebSocket endpoint.
///
/// These never escape the channel layer as application failures; the channel
/// state machine absorbs them and drives its reconnect policy instead.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Failed to establish the WebSocket connection
    CannotConnect(String),
    /// Failed to send data over an open connection
    SendFailed(String),
    /// Failed to receive data, or the peer closed the connection
    ReceiveFailed(String),
    /// Malformed endpoint URL
    InvalidUrl(String),
    /// Operation attempted in a state that does not allow it
    InvalidState(String),
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::CannotConnect(msg) => {
                write!(f, "NetworkError: Unable to connect: {}", msg)
            }
            NetworkError::SendFailed(msg) => {
                write!(f, "NetworkError: Send failed: {}", msg)
            }
            NetworkError::ReceiveFailed(msg) => {
                write!(f, "NetworkError: Receive failed: {}", msg)
            }
            NetworkError::InvalidUrl(msg) => {
                write!(f, "NetworkError: Invalid URL: {}", msg)
            }
            NetworkError::InvalidState(msg) => {
                write!(f, "NetworkError: Invalid state: {}", msg)
            }
        }
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
