//! # Vigil - Live Exam-Proctoring Telemetry Client
//!
//! Vigil is the client-side half of a live proctoring pipeline: it maintains a
//! long-lived duplex telemetry channel between an exam-taker and a remote
//! detection service, converts the service's continuous risk score into a
//! discrete alert state, and aggregates per-student updates into a teacher-side
//! roster. The video analysis itself (face, gaze, object detection) happens in
//! the external service; this crate only speaks its wire protocol.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! vigil = "0.2"
//! ```
//!
//! ```rust,no_run
//! use vigil::client::{SessionController, SessionInfo};
//! use vigil::config::VigilConfig;
//!
//! let config = VigilConfig::default();
//! let info = SessionInfo {
//!     session_id: "sess-1".into(),
//!     student_id: "student-1".into(),
//!     exam_id: "exam-1".into(),
//!     started_at_ms: 0,
//! };
//! let mut controller = SessionController::new(info, &config);
//!
//! // The controller is a pure state machine: feed it the current monotonic
//! // time plus observed events, execute the actions it returns.
//! let actions = controller.start(0);
//! # let _ = actions;
//! ```
//!
//! ## Crate Layout
//!
//! - [`protocol`] — wire message types and the shared proctoring vocabulary
//! - [`io`] — poll-based WebSocket endpoint (non-blocking `tungstenite`)
//! - [`config`] — TOML configuration with environment overrides
//! - [`observability`] — `tracing` subscriber initialization
//! - [`client`] — session channel, risk state machine, capture scheduler,
//!   environment watchers, observer aggregator, and the Tokio driver
//!
//! ## Design
//!
//! Every core component is a deterministic state machine: time (`NowMs`) and
//! observed events go in, actions come out, and the Tokio driver is the only
//! place where sockets, clocks, and sleeps exist. This keeps the reconnect
//! policy, alert mapping, violation windowing, and roster grace-period logic
//! unit-testable without a network or timers.

pub use vigil_client as client;
pub use vigil_config as config;
pub use vigil_io as io;
pub use vigil_observability as observability;
pub use vigil_protocol as protocol;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use vigil_client::{
        BrowserSignal, CaptureScheduler, ChannelAction, ChannelEvent, ChannelPhase,
        ChannelRoute, ChannelStateMachine, ClientError, FrameSource, NowMs,
        ObserverAggregator, RiskMachine, RiskSignal, RiskState, SessionAction,
        SessionController, SessionEvent, SessionInfo,
    };
    pub use vigil_config::VigilConfig;
    pub use vigil_protocol::{
        AlertLevel, DetectionReport, EventLevel, ExamClientMessage, ExamServerMessage,
        ObserverClientMessage, ObserverServerMessage, ResultPayload, ViolationKind, WireEvent,
    };
}
