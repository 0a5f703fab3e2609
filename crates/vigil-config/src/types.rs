//! Configuration type definitions
//!
//! These structs map to sections in `vigil_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VigilConfig {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub channel: ChannelConfig,
    pub risk: RiskConfig,
    pub logging: LoggingConfig,
}

/// Detection service endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL for the session REST endpoints (`/sessions/start`, ...).
    pub http_base: String,
    /// Base URL for the telemetry WebSocket routes (`/ws/exam/{id}`, ...).
    pub ws_base: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_base: "http://localhost:8000".to_string(),
            ws_base: "ws://localhost:8000".to_string(),
        }
    }
}

/// Frame capture cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Milliseconds between frame submissions. 250ms (4 samples/sec) is the
    /// canonical proctoring cadence.
    pub frame_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 250,
        }
    }
}

/// Channel lifecycle policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Base reconnect delay; attempt N waits `base * N` milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Reconnect attempts before the channel settles into the exhausted
    /// (manual-reconnect) state.
    pub max_reconnect_attempts: u32,
    /// Keep-alive cadence on the observer channel. The student channel does
    /// not ping; its frame cadence keeps the connection warm.
    pub observer_ping_interval_ms: u64,
    /// How long a disconnected roster entry lingers before removal.
    pub roster_grace_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: 2_000,
            max_reconnect_attempts: 5,
            observer_ping_interval_ms: 30_000,
            roster_grace_ms: 5_000,
        }
    }
}

/// Risk state machine tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    /// How long the active violation stays set after its last observation.
    pub violation_dwell_ms: u64,
    /// Same-kind detection events inside this window collapse into one entry.
    pub suppression_window_ms: u64,
    /// Bound on the recent-events list.
    pub recent_events_limit: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            violation_dwell_ms: 3_000,
            suppression_window_ms: 1_000,
            recent_events_limit: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
