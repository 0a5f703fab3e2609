//! Alert levels, event severities, and violation kinds.

use serde::{Deserialize, Serialize};

/// Discretized risk category derived from the continuous anomaly score.
///
/// The mapping is a pure function of the score and is the only way an alert
/// level is ever produced; callers never set it independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Normal,
    Warning,
    Danger,
}

impl AlertLevel {
    /// Score thresholds: `score >= 70` is danger, `30 <= score < 70` is
    /// warning, anything below 30 is normal.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            AlertLevel::Danger
        } else if score >= 30.0 {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }
}

/// Severity attached to a single violation event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    #[default]
    Info,
    Warning,
    Danger,
}

impl EventLevel {
    /// Whether this severity is worth surfacing as the active violation.
    pub fn is_notable(&self) -> bool {
        matches!(self, EventLevel::Warning | EventLevel::Danger)
    }
}

/// One kind of anomaly observation.
///
/// The detection service emits free-form kind strings, so an open `Other`
/// variant carries anything this client does not know about yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViolationKind {
    /// No face visible in frame.
    FaceAbsence,
    /// Head pose flagged suspicious (looking away from the screen).
    HeadPose,
    /// Gaze flagged as looking away.
    EyeGaze,
    /// More than one face in frame.
    MultipleFaces,
    /// A forbidden object (phone, notes) detected.
    ObjectDetected,
    /// Browser tab hidden — synthetic, client-observed.
    TabSwitch,
    /// Window lost focus — synthetic, client-observed.
    WindowBlur,
    /// Unrecognized kind, preserved verbatim.
    Other(String),
}

impl ViolationKind {
    pub fn as_str(&self) -> &str {
        match self {
            ViolationKind::FaceAbsence => "face_absence",
            ViolationKind::HeadPose => "head_pose",
            ViolationKind::EyeGaze => "eye_gaze",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::ObjectDetected => "object_detected",
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::WindowBlur => "window_blur",
            ViolationKind::Other(s) => s.as_str(),
        }
    }

    /// Synthetic kinds are observed by the browser itself rather than the
    /// detection service and bypass detector-jitter suppression.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, ViolationKind::TabSwitch | ViolationKind::WindowBlur)
    }
}

impl From<String> for ViolationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "face_absence" => ViolationKind::FaceAbsence,
            "head_pose" => ViolationKind::HeadPose,
            "eye_gaze" => ViolationKind::EyeGaze,
            "multiple_faces" => ViolationKind::MultipleFaces,
            "object_detected" => ViolationKind::ObjectDetected,
            "tab_switch" => ViolationKind::TabSwitch,
            "window_blur" => ViolationKind::WindowBlur,
            _ => ViolationKind::Other(s),
        }
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
