//! Wire message types for the proctoring telemetry protocol.
//!
//! Everything the client exchanges with the detection service is a single
//! self-describing JSON message with a `type` discriminator. This crate holds
//! those message shapes plus the shared vocabulary (alert levels, violation
//! kinds, detection payloads) used on both the student and observer channels.
//!
//! Forward compatibility rule: unknown `type` discriminators decode into an
//! explicit `Unknown` variant and are ignored by consumers, never treated as
//! errors.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod alert;
mod detection;
mod messages;

pub use alert::{AlertLevel, EventLevel, ViolationKind};
pub use detection::{DetectedObject, DetectionReport, EyeGazeReading, FacePresence, HeadPoseReading};
pub use messages::{
    ActiveSession, ExamClientMessage, ExamServerMessage, ObserverClientMessage,
    ObserverServerMessage, ResultPayload, StudentUpdatePayload, WireEvent,
};
