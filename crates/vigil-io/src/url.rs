//! WebSocket URL validation and normalization.

use crate::NetworkError;

/// URL newtype for WebSocket endpoints with validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsUrl {
    url: String,
}

impl WsUrl {
    /// Creates a new `WsUrl` after validating the format.
    ///
    /// The URL is normalized to include the `ws://` scheme when none is
    /// present; `wss://` is preserved.
    pub fn new(url: &str) -> Result<Self, NetworkError> {
        let normalized = normalize_ws_url(url);
        validate_ws_url(&normalized)?;
        Ok(WsUrl { url: normalized })
    }

    /// Returns the URL with the given path appended.
    ///
    /// A single slash joins base and path regardless of how either side is
    /// written.
    pub fn join(&self, path: &str) -> Result<Self, NetworkError> {
        let base = self.url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        WsUrl::new(&format!("{base}/{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Whether this is a secure WebSocket URL (`wss://`).
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("wss://")
    }

    /// Extracts `host:port` for the underlying TCP connection.
    ///
    /// Defaults to port 80 for `ws://` and 443 for `wss://` when no port is
    /// given.
    pub fn host_port(&self) -> String {
        let is_secure = self.is_secure();
        let without_scheme = self
            .url
            .strip_prefix("ws://")
            .or_else(|| self.url.strip_prefix("wss://"))
            .unwrap_or(&self.url);
        let host_port = without_scheme.split('/').next().unwrap_or(without_scheme);

        if host_port.contains(':') {
            host_port.to_string()
        } else {
            let default_port = if is_secure { 443 } else { 80 };
            format!("{}:{}", host_port, default_port)
        }
    }
}

impl std::fmt::Display for WsUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn normalize_ws_url(url: &str) -> String {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        url.to_string()
    } else {
        format!("ws://{}", url)
    }
}

fn validate_ws_url(url: &str) -> Result<(), NetworkError> {
    const VALID_PREFIXES: [&str; 2] = ["ws://", "wss://"];

    let addr_part = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .ok_or_else(|| {
            NetworkError::InvalidUrl(format!(
                "'{}' must start with one of {:?}",
                url, VALID_PREFIXES
            ))
        })?;

    if addr_part.is_empty() {
        return Err(NetworkError::InvalidUrl(format!(
            "'{}' has an empty address after the scheme",
            url
        )));
    }

    let host_port = addr_part.split('/').next().unwrap_or(addr_part);
    if host_port.is_empty() {
        return Err(NetworkError::InvalidUrl(format!("'{}' has an empty host", url)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_ws_scheme() {
        let url = WsUrl::new("localhost:8080").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080");
        assert!(!url.is_secure());
    }

    #[test]
    fn wss_scheme_is_preserved() {
        let url = WsUrl::new("wss://detect.example.com").unwrap();
        assert!(url.is_secure());
        assert_eq!(url.host_port(), "detect.example.com:443");
    }

    #[test]
    fn host_port_strips_path() {
        let url = WsUrl::new("ws://localhost:9000/ws/exam/abc").unwrap();
        assert_eq!(url.host_port(), "localhost:9000");
    }

    #[test]
    fn join_handles_slashes() {
        let base = WsUrl::new("ws://localhost:9000/").unwrap();
        let joined = base.join("/ws/exam/s-1").unwrap();
        assert_eq!(joined.as_str(), "ws://localhost:9000/ws/exam/s-1");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(WsUrl::new("ws://").is_err());
        assert!(WsUrl::new("").is_err());
    }
}
