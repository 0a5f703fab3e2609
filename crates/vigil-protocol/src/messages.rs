//! Telemetry channel message framing.
//!
//! Student channel (`/ws/exam/{session_id}`): the client pushes frames and
//! browser events, the service pushes detection results. Observer channel
//! (`/ws/teacher/{exam_id}`): the client only pings; the service multiplexes
//! per-student updates for a whole exam.

use serde::{Deserialize, Serialize};

use crate::alert::{AlertLevel, EventLevel, ViolationKind};
use crate::detection::DetectionReport;

/// One discrete anomaly observation as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub level: EventLevel,
    #[serde(default)]
    pub score_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Payload of an inbound `result` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultPayload {
    pub score: f64,
    pub alert_level: AlertLevel,
    pub annotated_frame: Option<String>,
    pub detections: Option<DetectionReport>,
    pub events: Option<Vec<WireEvent>>,
    pub timestamp: Option<String>,
}

/// Messages sent by the exam-taker's client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExamClientMessage {
    /// One captured camera frame, base64-encoded.
    Frame { data: String },
    /// A browser-level signal (tab switch, window blur).
    BrowserEvent {
        event_type: ViolationKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    Ping,
}

/// Messages received on the student channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExamServerMessage {
    Result(ResultPayload),
    Connected,
    Pong,
    /// Unrecognized discriminator — ignored for forward compatibility.
    #[serde(other)]
    Unknown,
}

/// Messages sent by the observer (teacher) client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverClientMessage {
    Ping,
}

/// One active session as listed in an `initial_state` snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSession {
    pub session_id: String,
    pub student_id: String,
    pub student_name: String,
    pub current_score: f64,
    pub started_at: Option<String>,
}

/// Per-student merge payload of a `student_update` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentUpdatePayload {
    pub session_id: String,
    pub score: Option<f64>,
    pub alert_level: Option<AlertLevel>,
    pub recent_events: Option<Vec<WireEvent>>,
    pub annotated_frame: Option<String>,
    pub timestamp: Option<String>,
}

/// Messages received on the observer channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverServerMessage {
    /// Bulk snapshot of all sessions active when the observer joined.
    InitialState {
        #[serde(default)]
        exam_id: Option<String>,
        #[serde(default)]
        active_sessions: Vec<ActiveSession>,
    },
    StudentConnected {
        session_id: String,
        student_id: String,
        student_name: String,
    },
    StudentDisconnected {
        session_id: String,
    },
    StudentUpdate(StudentUpdatePayload),
    Pong,
    /// Unrecognized discriminator — ignored for forward compatibility.
    #[serde(other)]
    Unknown,
}
