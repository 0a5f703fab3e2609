//! Browser environment signals.
//!
//! The embedding UI observes its own environment (page visibility, window
//! focus) and injects what it sees as [`BrowserSignal`]s. The mapping to
//! violation kind and severity lives here so the controller and the service
//! agree on vocabulary.

use vigil_protocol::{EventLevel, ViolationKind};

/// A client-side environment observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserSignal {
    /// The exam tab went hidden (switched away or minimized).
    TabHidden,
    /// The exam window lost input focus without the tab hiding.
    WindowBlur,
}

impl BrowserSignal {
    /// The violation kind reported for this signal.
    pub fn violation_kind(&self) -> ViolationKind {
        match self {
            BrowserSignal::TabHidden => ViolationKind::TabSwitch,
            BrowserSignal::WindowBlur => ViolationKind::WindowBlur,
        }
    }

    /// Severity: leaving the tab entirely is danger, a mere focus loss
    /// (another monitor, a system dialog) is warning.
    pub fn level(&self) -> EventLevel {
        match self {
            BrowserSignal::TabHidden => EventLevel::Danger,
            BrowserSignal::WindowBlur => EventLevel::Warning,
        }
    }
}
