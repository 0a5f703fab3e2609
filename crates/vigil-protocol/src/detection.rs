//! Structured detection payloads produced by the analysis service.
//!
//! The service is a black box; these shapes only mirror what it puts on the
//! wire. All fields default so a partial payload still decodes.

use serde::{Deserialize, Serialize};

use crate::alert::ViolationKind;

/// Head pose estimate for the primary face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseReading {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub direction: Option<String>,
    pub is_suspicious: bool,
}

/// Eye gaze estimate for the primary face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeGazeReading {
    pub direction: Option<String>,
    pub is_looking_away: bool,
    /// How often the gaze has wandered recently, as reported by the service.
    pub frequency: f64,
}

/// Face presence summary for the current frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacePresence {
    pub count: u32,
    pub present: bool,
    /// Seconds the face has been continuously absent.
    pub absence_duration: f64,
}

/// One object recognized in the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
    pub is_forbidden: bool,
}

/// The full detection payload attached to a `result` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionReport {
    pub head_pose: Option<HeadPoseReading>,
    pub eye_gaze: Option<EyeGazeReading>,
    pub face: Option<FacePresence>,
    pub objects: Option<Vec<DetectedObject>>,
}

impl DetectionReport {
    /// Derives the single active violation from this payload.
    ///
    /// Fixed priority order, first match wins: face absence, suspicious head
    /// pose, gaze away, multiple faces, forbidden object. This is a tie-break
    /// policy — only one violation is active at a time, chosen by priority,
    /// not by recency or severity.
    pub fn primary_violation(&self) -> Option<ViolationKind> {
        if let Some(face) = &self.face {
            if !face.present {
                return Some(ViolationKind::FaceAbsence);
            }
        }
        if self.head_pose.as_ref().is_some_and(|p| p.is_suspicious) {
            return Some(ViolationKind::HeadPose);
        }
        if self.eye_gaze.as_ref().is_some_and(|g| g.is_looking_away) {
            return Some(ViolationKind::EyeGaze);
        }
        if self.face.as_ref().is_some_and(|f| f.count > 1) {
            return Some(ViolationKind::MultipleFaces);
        }
        if self
            .objects
            .as_ref()
            .is_some_and(|objs| objs.iter().any(|o| o.is_forbidden))
        {
            return Some(ViolationKind::ObjectDetected);
        }
        None
    }

    /// Labels of all forbidden objects in the frame.
    pub fn forbidden_labels(&self) -> Vec<String> {
        self.objects
            .as_ref()
            .map(|objs| {
                objs.iter()
                    .filter(|o| o.is_forbidden)
                    .map(|o| o.label.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
