//! Risk state machine.
//!
//! Folds the detection service's `result` stream, plus locally observed
//! browser signals, into the single risk picture the embedding UI renders:
//! cumulative score, derived alert level, the one active violation, and a
//! bounded newest-first event feed.
//!
//! Pure and deterministic: all time comes in as `now_ms` arguments, so every
//! windowing rule (violation dwell, same-kind suppression) is unit-testable
//! without timers.

use std::collections::HashMap;

use tracing::debug;

use vigil_config::RiskConfig;
use vigil_protocol::{AlertLevel, EventLevel, ResultPayload, ViolationKind, WireEvent};

use crate::NowMs;

/// One entry in the recent-events feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub kind: ViolationKind,
    pub level: EventLevel,
    pub score_delta: f64,
    pub details: Option<serde_json::Value>,
    pub recorded_at_ms: NowMs,
}

/// Snapshot of the risk picture, shaped for direct rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskState {
    /// Cumulative anomaly score as last reported by the service.
    pub score: f64,
    /// Always derived from `score`; never set independently.
    pub alert_level: AlertLevel,
    /// The single violation currently shown, or none.
    pub current_violation: Option<ViolationKind>,
    /// Newest first, bounded by `recent_events_limit`.
    pub recent_events: Vec<RecordedEvent>,
    /// Whether the session channel is currently open.
    pub connected: bool,
    /// Most recent annotated frame from the service, if any.
    pub annotated_frame: Option<String>,
}

/// Edge signals produced while folding a result in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskSignal {
    /// The alert level just crossed into danger on an explicitly-danger
    /// message. Fired once per transition; the driver surfaces it as the
    /// student-facing warning.
    DangerEntered,
}

/// Folds detection results and browser signals into a [`RiskState`].
#[derive(Debug)]
pub struct RiskMachine {
    config: RiskConfig,
    state: RiskState,
    violation_clear_at_ms: Option<NowMs>,
    /// Last time each detection-origin kind was recorded, for suppression.
    last_recorded_at_ms: HashMap<ViolationKind, NowMs>,
}

impl RiskMachine {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            config: config.clone(),
            state: RiskState::default(),
            violation_clear_at_ms: None,
            last_recorded_at_ms: HashMap::new(),
        }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Fold one inbound `result` payload in.
    ///
    /// Violation selection prefers the payload's explicit event list (first
    /// warning-or-worse event) and falls back to deriving from the structured
    /// detections. Seeing a violation arms a restartable clear deadline;
    /// [`tick`](Self::tick) retires it once observations stop.
    pub fn apply_result(&mut self, now_ms: NowMs, payload: &ResultPayload) -> Option<RiskSignal> {
        let previous_level = self.state.alert_level;

        self.state.score = payload.score;
        self.state.alert_level = AlertLevel::from_score(payload.score);
        if payload.annotated_frame.is_some() {
            self.state.annotated_frame = payload.annotated_frame.clone();
        }

        let from_events = payload.events.as_deref().and_then(|events| {
            events
                .iter()
                .find(|e| e.level.is_notable())
                .map(|e| e.kind.clone())
        });
        let violation = from_events.clone().or_else(|| {
            payload
                .detections
                .as_ref()
                .and_then(|d| d.primary_violation())
        });

        if let Some(kind) = violation {
            // Restartable: each observation pushes the clear deadline out.
            self.violation_clear_at_ms = Some(now_ms + self.config.violation_dwell_ms);
            if self.state.current_violation.as_ref() != Some(&kind) {
                debug!(violation = %kind, "active violation changed");
            }
            // A detection-derived violation has no wire event of its own, so
            // it gets a synthesized feed entry; an event-derived one is
            // recorded by the event loop below with its real payload.
            if from_events.is_none() {
                self.record_suppressed(now_ms, kind.clone(), EventLevel::Warning, 0.0, None);
            }
            self.state.current_violation = Some(kind);
        }

        for event in payload.events.as_deref().unwrap_or(&[]) {
            self.record_wire_event(now_ms, event);
        }

        // The notification fires only on a genuine transition, and only when
        // the service itself marked the message danger. A locally derived
        // danger on a non-danger message stays silent.
        if self.state.alert_level == AlertLevel::Danger
            && previous_level != AlertLevel::Danger
            && payload.alert_level == AlertLevel::Danger
        {
            Some(RiskSignal::DangerEntered)
        } else {
            None
        }
    }

    /// Record a browser-observed signal. Synthetic kinds bypass the
    /// detector-jitter suppression: every tab switch is its own entry.
    pub fn record_browser_event(
        &mut self,
        now_ms: NowMs,
        kind: ViolationKind,
        level: EventLevel,
        details: Option<serde_json::Value>,
    ) {
        self.prepend(RecordedEvent {
            kind: kind.clone(),
            level,
            score_delta: 0.0,
            details,
            recorded_at_ms: now_ms,
        });
        self.violation_clear_at_ms = Some(now_ms + self.config.violation_dwell_ms);
        self.state.current_violation = Some(kind);
    }

    /// Retire the active violation once its dwell window has lapsed with no
    /// further observations.
    pub fn tick(&mut self, now_ms: NowMs) {
        if let Some(clear_at) = self.violation_clear_at_ms {
            if now_ms >= clear_at {
                self.violation_clear_at_ms = None;
                if self.state.current_violation.take().is_some() {
                    debug!("active violation cleared");
                }
            }
        }
    }

    /// Disarm the pending violation-clear deadline (part of session stop).
    pub fn cancel_violation_clear(&mut self) {
        self.violation_clear_at_ms = None;
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.state.connected = connected;
    }

    fn record_wire_event(&mut self, now_ms: NowMs, event: &WireEvent) {
        self.record_suppressed(
            now_ms,
            event.kind.clone(),
            event.level,
            event.score_delta,
            event.details.clone(),
        );
    }

    fn record_suppressed(
        &mut self,
        now_ms: NowMs,
        kind: ViolationKind,
        level: EventLevel,
        score_delta: f64,
        details: Option<serde_json::Value>,
    ) {
        if let Some(last) = self.last_recorded_at_ms.get(&kind) {
            if now_ms.saturating_sub(*last) < self.config.suppression_window_ms {
                return;
            }
        }
        self.last_recorded_at_ms.insert(kind.clone(), now_ms);
        self.prepend(RecordedEvent {
            kind,
            level,
            score_delta,
            details,
            recorded_at_ms: now_ms,
        });
    }

    fn prepend(&mut self, event: RecordedEvent) {
        self.state.recent_events.insert(0, event);
        self.state.recent_events.truncate(self.config.recent_events_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_protocol::{DetectionReport, FacePresence, HeadPoseReading};

    fn machine() -> RiskMachine {
        RiskMachine::new(&RiskConfig::default())
    }

    fn result(score: f64) -> ResultPayload {
        ResultPayload {
            score,
            alert_level: AlertLevel::from_score(score),
            ..Default::default()
        }
    }

    fn result_with_violation(score: f64, kind: ViolationKind) -> ResultPayload {
        ResultPayload {
            events: Some(vec![WireEvent {
                kind,
                level: EventLevel::Warning,
                score_delta: 5.0,
                details: None,
                timestamp: None,
            }]),
            ..result(score)
        }
    }

    #[test]
    fn alert_level_tracks_the_reported_score() {
        let mut m = machine();
        for (score, expected) in [
            (10.0, AlertLevel::Normal),
            (25.0, AlertLevel::Normal),
            (35.0, AlertLevel::Warning),
            (72.0, AlertLevel::Danger),
            (15.0, AlertLevel::Normal),
        ] {
            m.apply_result(0, &result(score));
            assert_eq!(m.state().alert_level, expected, "score {score}");
            assert_eq!(m.state().score, score);
        }
    }

    #[test]
    fn danger_signal_fires_once_per_transition() {
        let mut m = machine();
        let signals: Vec<_> = [10.0, 25.0, 35.0, 72.0, 72.0, 15.0]
            .iter()
            .map(|&s| m.apply_result(0, &result(s)))
            .collect();
        assert_eq!(
            signals,
            vec![
                None,
                None,
                None,
                Some(RiskSignal::DangerEntered),
                None,
                None
            ]
        );

        // Leaving and re-entering danger fires again.
        assert_eq!(
            m.apply_result(0, &result(90.0)),
            Some(RiskSignal::DangerEntered)
        );
    }

    #[test]
    fn derived_danger_on_non_danger_message_stays_silent() {
        // Score crosses the threshold but the service did not mark the
        // message danger: the level changes, the notification does not fire.
        let mut m = machine();
        let payload = ResultPayload {
            score: 85.0,
            alert_level: AlertLevel::Warning,
            ..Default::default()
        };
        assert_eq!(m.apply_result(0, &payload), None);
        assert_eq!(m.state().alert_level, AlertLevel::Danger);
    }

    #[test]
    fn event_list_outranks_structured_detections() {
        let mut m = machine();
        let payload = ResultPayload {
            detections: Some(DetectionReport {
                face: Some(FacePresence {
                    present: false,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            events: Some(vec![WireEvent {
                kind: ViolationKind::EyeGaze,
                level: EventLevel::Warning,
                score_delta: 2.0,
                details: None,
                timestamp: None,
            }]),
            ..result(40.0)
        };
        m.apply_result(0, &payload);
        assert_eq!(
            m.state().current_violation,
            Some(ViolationKind::EyeGaze)
        );
    }

    #[test]
    fn detections_back_fill_when_no_notable_event() {
        let mut m = machine();
        let payload = ResultPayload {
            detections: Some(DetectionReport {
                head_pose: Some(HeadPoseReading {
                    is_suspicious: true,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            events: Some(vec![WireEvent {
                kind: ViolationKind::Other("heartbeat".into()),
                level: EventLevel::Info,
                score_delta: 0.0,
                details: None,
                timestamp: None,
            }]),
            ..result(40.0)
        };
        m.apply_result(0, &payload);
        assert_eq!(m.state().current_violation, Some(ViolationKind::HeadPose));
    }

    #[test]
    fn violation_clears_after_dwell_and_restarts_on_reobservation() {
        let mut m = machine();
        m.apply_result(0, &result_with_violation(40.0, ViolationKind::EyeGaze));
        assert!(m.state().current_violation.is_some());

        // Re-observed at 2s: the 3s deadline restarts from there.
        m.apply_result(2_000, &result_with_violation(42.0, ViolationKind::EyeGaze));
        m.tick(3_500);
        assert!(m.state().current_violation.is_some());

        m.tick(4_999);
        assert!(m.state().current_violation.is_some());
        m.tick(5_000);
        assert_eq!(m.state().current_violation, None);
    }

    #[test]
    fn violation_without_reobservation_clears_once() {
        let mut m = machine();
        m.apply_result(0, &result_with_violation(40.0, ViolationKind::HeadPose));
        m.tick(3_000);
        assert_eq!(m.state().current_violation, None);
        // A benign result afterwards does not resurrect it.
        m.apply_result(3_100, &result(10.0));
        m.tick(10_000);
        assert_eq!(m.state().current_violation, None);
    }

    #[test]
    fn cancel_violation_clear_disarms_the_deadline() {
        let mut m = machine();
        m.apply_result(0, &result_with_violation(40.0, ViolationKind::EyeGaze));
        m.cancel_violation_clear();
        m.tick(60_000);
        // The deadline was disarmed; the violation stays as-is until a new
        // session replaces this machine.
        assert!(m.state().current_violation.is_some());
    }

    #[test]
    fn same_kind_events_inside_the_window_collapse() {
        let mut m = machine();
        m.apply_result(0, &result_with_violation(40.0, ViolationKind::EyeGaze));
        let before = m.state().recent_events.len();
        // 500ms later, same kind: suppressed.
        m.apply_result(500, &result_with_violation(41.0, ViolationKind::EyeGaze));
        assert_eq!(m.state().recent_events.len(), before);
        // Past the window: recorded.
        m.apply_result(1_500, &result_with_violation(42.0, ViolationKind::EyeGaze));
        assert!(m.state().recent_events.len() > before);
    }

    #[test]
    fn browser_events_bypass_suppression() {
        let mut m = machine();
        m.record_browser_event(0, ViolationKind::TabSwitch, EventLevel::Danger, None);
        m.record_browser_event(100, ViolationKind::TabSwitch, EventLevel::Danger, None);
        assert_eq!(m.state().recent_events.len(), 2);
        assert_eq!(
            m.state().current_violation,
            Some(ViolationKind::TabSwitch)
        );
        assert_eq!(m.state().recent_events[0].recorded_at_ms, 100);
    }

    #[test]
    fn recent_events_keep_the_newest_ten() {
        let mut m = machine();
        for i in 0..15u64 {
            m.record_browser_event(
                i * 2_000,
                ViolationKind::Other(format!("kind-{i}")),
                EventLevel::Info,
                None,
            );
        }
        let events = &m.state().recent_events;
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].kind, ViolationKind::Other("kind-14".into()));
        assert_eq!(events[9].kind, ViolationKind::Other("kind-5".into()));
    }

    #[test]
    fn annotated_frame_persists_across_sparse_payloads() {
        let mut m = machine();
        let mut payload = result(10.0);
        payload.annotated_frame = Some("data:image/jpeg;base64,xyz".into());
        m.apply_result(0, &payload);
        m.apply_result(250, &result(12.0));
        assert_eq!(
            m.state().annotated_frame.as_deref(),
            Some("data:image/jpeg;base64,xyz")
        );
    }
}
