//! WebSocket transport for the vigil telemetry channel.
//!
//! Implements a duplex, poll-based WebSocket endpoint on top of `tungstenite`
//! with a non-blocking `std::net::TcpStream`. All operations check for
//! `WouldBlock`, so the endpoint can be driven from any async runtime or
//! synchronously; nothing here ever blocks on the network.
//!
//! # Usage Contract
//!
//! - Always call [`WsEndpoint::poll`] before consuming data.
//! - Send operations are only valid in the `Active*` states.
//! - Consuming a message is only meaningful in `ActiveHasData`.
//! - Any state can transition to `Errored`; call
//!   [`WsEndpoint::confirm_error_and_close`] to return to `Inactive`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod endpoint;
mod error;
mod url;

pub use endpoint::{EndpointState, WsEndpoint};
pub use error::NetworkError;
pub use url::WsUrl;
