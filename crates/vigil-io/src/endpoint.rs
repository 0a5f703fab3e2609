//! Duplex poll-based WebSocket endpoint.
//!
//! The telemetry channel both pushes (frames, browser events, pings) and
//! receives (results, roster updates) on one socket, so unlike a pub/sub
//! split this endpoint is duplex: send operations and a polled receive
//! buffer share the same connection.

use std::io::ErrorKind;
use std::net::TcpStream;

use tracing::debug;
use tungstenite::{connect, Message, WebSocket};

use crate::{NetworkError, WsUrl};

/// Type alias for WebSocket over TcpStream
type WsStream = WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>>;

/// Current state of the endpoint.
///
/// ```text
/// ┌──────────┐     request_connect      ┌───────────────┐
/// │ Inactive │ ───────────────────────► │ ActiveWaiting │ ◄─────┐
/// └──────────┘                          └───────┬───────┘       │
///       ▲                                       │ (data arrives)│ (data consumed)
///       │ request_disconnect                    ▼               │
///       │                               ┌───────────────┐       │
///       └─────────────────────────────  │ ActiveHasData │ ──────┘
///                                       └───────────────┘
///
/// Any state can transition to Errored on failure.
/// confirm_error_and_close() returns to Inactive from Errored.
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointState {
    /// Not connected and not attempting to connect.
    Inactive,
    /// Connected; no inbound message buffered.
    ActiveWaiting,
    /// Connected with one inbound message ready to consume.
    ActiveHasData,
    /// The endpoint failed and must be acknowledged before reuse.
    Errored(NetworkError),
}

impl EndpointState {
    pub fn is_active(&self) -> bool {
        matches!(self, EndpointState::ActiveWaiting | EndpointState::ActiveHasData)
    }
}

/// A duplex WebSocket endpoint bound to one telemetry route.
pub struct WsEndpoint {
    url: WsUrl,
    current_state: EndpointState,
    socket: Option<WsStream>,
    receive_buffer: Option<String>,
    has_data: bool,
}

impl WsEndpoint {
    pub fn new(url: WsUrl) -> Self {
        Self {
            url,
            current_state: EndpointState::Inactive,
            socket: None,
            receive_buffer: None,
            has_data: false,
        }
    }

    pub fn url(&self) -> &WsUrl {
        &self.url
    }

    /// Drives a non-blocking read and reports the resulting state.
    pub fn poll(&mut self) -> &EndpointState {
        if matches!(self.current_state, EndpointState::ActiveWaiting) && !self.has_data {
            if self.try_receive() {
                self.has_data = true;
                self.current_state = EndpointState::ActiveHasData;
            }
        }
        &self.current_state
    }

    /// Establishes the connection. Only valid from `Inactive`.
    pub fn request_connect(&mut self) -> Result<(), NetworkError> {
        match &self.current_state {
            EndpointState::Inactive => {
                let (socket, _response) = connect(self.url.as_str())
                    .map_err(|e| NetworkError::CannotConnect(e.to_string()))?;

                // Set underlying stream to non-blocking
                if let tungstenite::stream::MaybeTlsStream::Plain(ref stream) = socket.get_ref() {
                    stream
                        .set_nonblocking(true)
                        .map_err(|e| NetworkError::CannotConnect(e.to_string()))?;
                }

                debug!(url = %self.url, "websocket endpoint connected");
                self.socket = Some(socket);
                self.current_state = EndpointState::ActiveWaiting;
                Ok(())
            }
            _ => Err(NetworkError::InvalidState(
                "Cannot connect: endpoint is not in Inactive state".to_string(),
            )),
        }
    }

    /// Closes the connection. Only valid from an active state.
    pub fn request_disconnect(&mut self) -> Result<(), NetworkError> {
        match &self.current_state {
            EndpointState::ActiveWaiting | EndpointState::ActiveHasData => {
                if let Some(mut socket) = self.socket.take() {
                    let _ = socket.close(None);
                }
                self.receive_buffer = None;
                self.has_data = false;
                self.current_state = EndpointState::Inactive;
                Ok(())
            }
            _ => Err(NetworkError::InvalidState(
                "Cannot disconnect: endpoint is not in Active state".to_string(),
            )),
        }
    }

    /// Acknowledges an error and returns the endpoint to `Inactive`.
    pub fn confirm_error_and_close(&mut self) -> Result<(), NetworkError> {
        match &self.current_state {
            EndpointState::Errored(_) => {
                if let Some(mut socket) = self.socket.take() {
                    let _ = socket.close(None);
                }
                self.receive_buffer = None;
                self.has_data = false;
                self.current_state = EndpointState::Inactive;
                Ok(())
            }
            _ => Err(NetworkError::InvalidState(
                "Cannot confirm error: endpoint is not in Errored state".to_string(),
            )),
        }
    }

    /// Sends one text message. Only valid in active states.
    ///
    /// A send failure moves the endpoint to `Errored`; the caller's close
    /// handling is the single retry mechanism.
    pub fn send_text(&mut self, text: &str) -> Result<(), NetworkError> {
        match &self.current_state {
            EndpointState::ActiveWaiting | EndpointState::ActiveHasData => {
                let socket = self
                    .socket
                    .as_mut()
                    .ok_or_else(|| NetworkError::SendFailed("Not connected".to_string()))?;

                let result = socket
                    .send(Message::Text(text.to_string()))
                    .and_then(|_| socket.flush());
                match result {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        let err = NetworkError::SendFailed(e.to_string());
                        self.current_state = EndpointState::Errored(err.clone());
                        Err(err)
                    }
                }
            }
            _ => Err(NetworkError::SendFailed(
                "Cannot send: endpoint is not in Active state".to_string(),
            )),
        }
    }

    /// Consumes the buffered inbound message. Only valid in `ActiveHasData`.
    pub fn consume_message(&mut self) -> Result<String, NetworkError> {
        match &self.current_state {
            EndpointState::ActiveHasData => {
                if self.has_data {
                    if let Some(data) = self.receive_buffer.take() {
                        self.has_data = false;
                        self.current_state = EndpointState::ActiveWaiting;
                        Ok(data)
                    } else {
                        Err(NetworkError::ReceiveFailed("No data in buffer".to_string()))
                    }
                } else {
                    Err(NetworkError::ReceiveFailed("No data available".to_string()))
                }
            }
            _ => Err(NetworkError::ReceiveFailed(
                "Cannot consume: no data available".to_string(),
            )),
        }
    }

    fn try_receive(&mut self) -> bool {
        let socket = match &mut self.socket {
            Some(s) => s,
            None => return false,
        };

        match socket.read() {
            Ok(Message::Text(text)) => {
                self.receive_buffer = Some(text);
                true
            }
            Ok(Message::Binary(data)) => {
                self.receive_buffer = Some(String::from_utf8_lossy(&data).into_owned());
                true
            }
            Ok(Message::Close(_)) => {
                self.current_state = EndpointState::Errored(NetworkError::ReceiveFailed(
                    "Connection closed".to_string(),
                ));
                false
            }
            Ok(_) => false, // Ping/Pong frames
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                self.current_state =
                    EndpointState::Errored(NetworkError::ReceiveFailed(e.to_string()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    fn spawn_echo_server() -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            while let Ok(msg) = ws.read() {
                match msg {
                    Message::Text(text) => {
                        if ws.send(Message::Text(text)).is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });
        (format!("ws://{}", addr), handle)
    }

    fn poll_until_has_data(endpoint: &mut WsEndpoint, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if matches!(endpoint.poll(), EndpointState::ActiveHasData) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn connect_send_receive_disconnect() {
        let (url, server) = spawn_echo_server();
        let mut endpoint = WsEndpoint::new(WsUrl::new(&url).unwrap());

        endpoint.request_connect().unwrap();
        assert!(endpoint.poll().is_active());

        endpoint.send_text(r#"{"type":"ping"}"#).unwrap();
        assert!(poll_until_has_data(&mut endpoint, Duration::from_secs(2)));
        assert_eq!(endpoint.consume_message().unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(*endpoint.poll(), EndpointState::ActiveWaiting);

        endpoint.request_disconnect().unwrap();
        assert_eq!(*endpoint.poll(), EndpointState::Inactive);
        drop(server);
    }

    #[test]
    fn send_while_inactive_is_invalid() {
        let mut endpoint = WsEndpoint::new(WsUrl::new("ws://localhost:1").unwrap());
        assert!(endpoint.send_text("x").is_err());
        assert!(endpoint.consume_message().is_err());
    }

    #[test]
    fn connect_to_closed_port_errors() {
        // Port 1 is never listening in the test environment.
        let mut endpoint = WsEndpoint::new(WsUrl::new("ws://127.0.0.1:1").unwrap());
        let err = endpoint.request_connect().unwrap_err();
        assert!(matches!(err, NetworkError::CannotConnect(_)));
        assert_eq!(*endpoint.poll(), EndpointState::Inactive);
    }

    #[test]
    fn peer_close_surfaces_as_errored() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.close(None).unwrap();
            // Drive the close handshake to completion.
            while ws.read().is_ok() {}
        });

        let mut endpoint = WsEndpoint::new(WsUrl::new(&format!("ws://{}", addr)).unwrap());
        endpoint.request_connect().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if matches!(endpoint.poll(), EndpointState::Errored(_)) {
                break;
            }
            assert!(Instant::now() < deadline, "endpoint never observed close");
            thread::sleep(Duration::from_millis(5));
        }

        endpoint.confirm_error_and_close().unwrap();
        assert_eq!(*endpoint.poll(), EndpointState::Inactive);
        server.join().unwrap();
    }
}
