//! Session channel state machine.
//!
//! One logical duplex connection to the detection service, either scoped to a
//! single exam-taking session (student) or to a whole exam (observer). The
//! machine owns connection intent, the reconnect/backoff ladder, and outbound
//! framing; the driver owns the actual socket.
//!
//! Failure semantics: transport errors are logged and treated as a precursor
//! to close, never independently retried — the reconnect ladder is the single
//! retry mechanism. Exhausting it degrades to a persistent `Exhausted` phase
//! for the UI to offer a manual reconnect; nothing ever escapes this boundary
//! as an error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use vigil_config::ChannelConfig;
use vigil_protocol::{ExamClientMessage, ObserverClientMessage, ViolationKind};

use crate::NowMs;

/// Which telemetry route this channel is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRoute {
    /// Student side: `/ws/exam/{session_id}`.
    Exam { session_id: String },
    /// Teacher side: `/ws/teacher/{exam_id}`.
    Observer { exam_id: String },
}

impl ChannelRoute {
    /// WebSocket path under the service base URL.
    pub fn path(&self) -> String {
        match self {
            ChannelRoute::Exam { session_id } => format!("/ws/exam/{session_id}"),
            ChannelRoute::Observer { exam_id } => format!("/ws/teacher/{exam_id}"),
        }
    }

    /// The observer channel is long-lived for the whole exam and is the only
    /// one that keep-alives; the student channel's frame cadence keeps its
    /// connection warm.
    pub fn is_observer(&self) -> bool {
        matches!(self, ChannelRoute::Observer { .. })
    }
}

/// Connection phase of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Never connected on this instance.
    Idle,
    /// A transport connect has been requested and not yet resolved.
    Connecting,
    /// Transport open; telemetry flows.
    Open,
    /// Waiting out a reconnect delay.
    BackingOff { resume_at_ms: NowMs },
    /// Reconnect ladder exhausted. Persistent state, not an error: the UI
    /// shows "offline, click to reconnect" and a later `connect()` restarts.
    Exhausted,
    /// Closed on purpose via `disconnect()`.
    Closed,
}

/// Transport observations fed in by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    TransportOpened,
    TransportClosed { reason: Option<String> },
    TransportErrored { error: String },
}

/// Actions for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    TransportConnect,
    TransportSend { text: String },
    TransportClose,
}

/// Reconnect ladder: attempt N waits `base_delay_ms * N`, capped at
/// `max_attempts` total attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 2_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    fn delay_for(&self, attempt: u32) -> u64 {
        self.base_delay_ms * u64::from(attempt)
    }
}

/// State machine for one logical telemetry connection.
#[derive(Debug)]
pub struct ChannelStateMachine {
    route: ChannelRoute,
    policy: ReconnectPolicy,
    ping_interval_ms: u64,
    phase: ChannelPhase,
    attempts: u32,
    manual_close: bool,
    last_ping_sent_at_ms: Option<NowMs>,
}

impl ChannelStateMachine {
    pub fn new(route: ChannelRoute, config: &ChannelConfig) -> Self {
        Self {
            route,
            policy: ReconnectPolicy {
                base_delay_ms: config.reconnect_base_delay_ms,
                max_attempts: config.max_reconnect_attempts,
            },
            ping_interval_ms: config.observer_ping_interval_ms,
            phase: ChannelPhase::Idle,
            attempts: 0,
            manual_close: false,
            last_ping_sent_at_ms: None,
        }
    }

    pub fn route(&self) -> &ChannelRoute {
        &self.route
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == ChannelPhase::Open
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    /// Begin connecting. Idempotent per instance: while already connecting,
    /// open, or backing off this is a no-op. From `Exhausted` it restarts the
    /// ladder (the manual-reconnect affordance).
    pub fn connect(&mut self) -> Vec<ChannelAction> {
        match self.phase {
            ChannelPhase::Idle | ChannelPhase::Closed | ChannelPhase::Exhausted => {
                self.manual_close = false;
                self.attempts = 0;
                self.phase = ChannelPhase::Connecting;
                debug!(route = %self.route.path(), "channel connecting");
                vec![ChannelAction::TransportConnect]
            }
            _ => Vec::new(),
        }
    }

    /// Close on purpose. Cancels any pending reconnect; a manual close never
    /// triggers another connect.
    pub fn disconnect(&mut self) -> Vec<ChannelAction> {
        self.manual_close = true;
        self.last_ping_sent_at_ms = None;
        let was_live = matches!(
            self.phase,
            ChannelPhase::Connecting | ChannelPhase::Open
        );
        self.phase = ChannelPhase::Closed;
        if was_live {
            vec![ChannelAction::TransportClose]
        } else {
            Vec::new()
        }
    }

    /// Submit one captured frame. Dropped silently when the channel is not
    /// open — best-effort telemetry, never queued.
    pub fn send_frame(&mut self, data: String) -> Vec<ChannelAction> {
        self.send_message(&ExamClientMessage::Frame { data })
    }

    /// Report a browser-observed event.
    pub fn send_event(
        &mut self,
        event_type: ViolationKind,
        details: Option<serde_json::Value>,
    ) -> Vec<ChannelAction> {
        self.send_message(&ExamClientMessage::BrowserEvent {
            event_type,
            details,
        })
    }

    /// Apply one transport observation.
    pub fn handle(&mut self, now_ms: NowMs, event: &ChannelEvent) -> Vec<ChannelAction> {
        match event {
            ChannelEvent::TransportOpened => {
                info!(route = %self.route.path(), "channel open");
                self.phase = ChannelPhase::Open;
                self.attempts = 0;
                self.last_ping_sent_at_ms = Some(now_ms);
            }
            ChannelEvent::TransportErrored { error } => {
                // Precursor to close; the close event drives the ladder.
                warn!(route = %self.route.path(), error, "channel transport error");
            }
            ChannelEvent::TransportClosed { reason } => {
                self.last_ping_sent_at_ms = None;
                if self.manual_close {
                    self.phase = ChannelPhase::Closed;
                } else if matches!(
                    self.phase,
                    ChannelPhase::Connecting | ChannelPhase::Open | ChannelPhase::BackingOff { .. }
                ) {
                    if self.attempts < self.policy.max_attempts {
                        self.attempts += 1;
                        let delay = self.policy.delay_for(self.attempts);
                        info!(
                            route = %self.route.path(),
                            attempt = self.attempts,
                            max = self.policy.max_attempts,
                            delay_ms = delay,
                            reason = reason.as_deref().unwrap_or("unknown"),
                            "channel closed, reconnecting"
                        );
                        self.phase = ChannelPhase::BackingOff {
                            resume_at_ms: now_ms + delay,
                        };
                    } else {
                        warn!(
                            route = %self.route.path(),
                            attempts = self.attempts,
                            "reconnect attempts exhausted, channel offline"
                        );
                        self.phase = ChannelPhase::Exhausted;
                    }
                }
            }
        }
        Vec::new()
    }

    /// Advance time-driven behavior: resume from backoff when due and emit
    /// the observer keep-alive when due.
    pub fn step(&mut self, now_ms: NowMs) -> Vec<ChannelAction> {
        match self.phase {
            ChannelPhase::BackingOff { resume_at_ms } if now_ms >= resume_at_ms => {
                self.phase = ChannelPhase::Connecting;
                debug!(
                    route = %self.route.path(),
                    attempt = self.attempts,
                    "reconnect delay elapsed"
                );
                vec![ChannelAction::TransportConnect]
            }
            ChannelPhase::Open if self.route.is_observer() && self.ping_due(now_ms) => {
                self.last_ping_sent_at_ms = Some(now_ms);
                self.send_message(&ObserverClientMessage::Ping)
            }
            _ => Vec::new(),
        }
    }

    fn ping_due(&self, now_ms: NowMs) -> bool {
        if self.ping_interval_ms == 0 {
            return false;
        }
        match self.last_ping_sent_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.ping_interval_ms,
        }
    }

    fn send_message<T: Serialize>(&mut self, message: &T) -> Vec<ChannelAction> {
        if self.phase != ChannelPhase::Open {
            trace!(route = %self.route.path(), "outbound message dropped, channel not open");
            return Vec::new();
        }
        match serde_json::to_string(message) {
            Ok(text) => vec![ChannelAction::TransportSend { text }],
            Err(e) => {
                warn!(route = %self.route.path(), error = %e, "failed to encode outbound message");
                Vec::new()
            }
        }
    }
}

/// Decodes one inbound message, ignoring anything unreadable.
///
/// Protocol anomalies are not errors: a malformed or unexpected payload is
/// logged at debug and dropped.
pub fn decode_inbound<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(error = %e, "ignoring undecodable inbound message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_channel() -> ChannelStateMachine {
        ChannelStateMachine::new(
            ChannelRoute::Exam {
                session_id: "s-1".into(),
            },
            &ChannelConfig::default(),
        )
    }

    fn observer_channel() -> ChannelStateMachine {
        ChannelStateMachine::new(
            ChannelRoute::Observer {
                exam_id: "e-1".into(),
            },
            &ChannelConfig::default(),
        )
    }

    fn close(channel: &mut ChannelStateMachine, now_ms: NowMs) {
        channel.handle(now_ms, &ChannelEvent::TransportClosed { reason: None });
    }

    #[test]
    fn routes_map_to_ws_paths() {
        assert_eq!(exam_channel().route().path(), "/ws/exam/s-1");
        assert_eq!(observer_channel().route().path(), "/ws/teacher/e-1");
    }

    #[test]
    fn connect_is_idempotent() {
        let mut channel = exam_channel();
        assert_eq!(channel.connect(), vec![ChannelAction::TransportConnect]);
        assert_eq!(channel.connect(), Vec::new());
        channel.handle(0, &ChannelEvent::TransportOpened);
        assert_eq!(channel.connect(), Vec::new());
        assert!(channel.is_open());
    }

    #[test]
    fn reconnect_delays_are_2_4_6_8_10_seconds() {
        let mut channel = exam_channel();
        channel.connect();
        channel.handle(0, &ChannelEvent::TransportOpened);

        let mut now = 1_000;
        for expected_delay in [2_000u64, 4_000, 6_000, 8_000, 10_000] {
            close(&mut channel, now);
            match channel.phase() {
                ChannelPhase::BackingOff { resume_at_ms } => {
                    assert_eq!(resume_at_ms, now + expected_delay);
                }
                other => panic!("expected backoff, got {other:?}"),
            }
            // One tick early: nothing happens.
            assert_eq!(channel.step(now + expected_delay - 1), Vec::new());
            let actions = channel.step(now + expected_delay);
            assert_eq!(actions, vec![ChannelAction::TransportConnect]);
            now += expected_delay;
        }

        // Failure of the 5th reconnect attempt exhausts the ladder for good.
        close(&mut channel, now);
        assert_eq!(channel.phase(), ChannelPhase::Exhausted);
        assert_eq!(channel.step(now + 60_000), Vec::new());
    }

    #[test]
    fn successful_open_resets_the_attempt_counter() {
        let mut channel = exam_channel();
        channel.connect();
        close(&mut channel, 0);
        close(&mut channel, 100);
        assert_eq!(channel.reconnect_attempts(), 2);

        channel.handle(200, &ChannelEvent::TransportOpened);
        assert_eq!(channel.reconnect_attempts(), 0);

        // The ladder starts from the bottom again.
        close(&mut channel, 300);
        match channel.phase() {
            ChannelPhase::BackingOff { resume_at_ms } => assert_eq!(resume_at_ms, 2_300),
            other => panic!("expected backoff, got {other:?}"),
        }
    }

    #[test]
    fn manual_disconnect_never_reconnects() {
        let mut channel = exam_channel();
        channel.connect();
        channel.handle(0, &ChannelEvent::TransportOpened);

        let actions = channel.disconnect();
        assert_eq!(actions, vec![ChannelAction::TransportClose]);
        assert_eq!(channel.phase(), ChannelPhase::Closed);

        // The transport close that follows must not schedule anything.
        close(&mut channel, 10);
        assert_eq!(channel.phase(), ChannelPhase::Closed);
        assert_eq!(channel.step(100_000), Vec::new());
    }

    #[test]
    fn manual_disconnect_cancels_a_pending_reconnect() {
        let mut channel = exam_channel();
        channel.connect();
        channel.handle(0, &ChannelEvent::TransportOpened);
        close(&mut channel, 0);
        assert!(matches!(channel.phase(), ChannelPhase::BackingOff { .. }));

        channel.disconnect();
        // Well past the scheduled resume time: still nothing.
        assert_eq!(channel.step(10_000), Vec::new());
        assert_eq!(channel.phase(), ChannelPhase::Closed);
    }

    #[test]
    fn sends_are_dropped_while_not_open() {
        let mut channel = exam_channel();
        assert_eq!(channel.send_frame("abc".into()), Vec::new());

        channel.connect();
        assert_eq!(channel.send_frame("abc".into()), Vec::new());

        channel.handle(0, &ChannelEvent::TransportOpened);
        let actions = channel.send_frame("abc".into());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ChannelAction::TransportSend { text } => {
                let json: serde_json::Value = serde_json::from_str(text).unwrap();
                assert_eq!(json["type"], "frame");
                assert_eq!(json["data"], "abc");
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn observer_pings_every_interval_student_never() {
        let mut observer = observer_channel();
        observer.connect();
        observer.handle(0, &ChannelEvent::TransportOpened);

        assert_eq!(observer.step(29_999), Vec::new());
        let actions = observer.step(30_000);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ChannelAction::TransportSend { text } => {
                assert_eq!(text, r#"{"type":"ping"}"#);
            }
            other => panic!("expected ping, got {other:?}"),
        }
        // Next ping is a full interval later.
        assert_eq!(observer.step(30_001), Vec::new());
        assert_eq!(observer.step(60_000).len(), 1);

        let mut student = exam_channel();
        student.connect();
        student.handle(0, &ChannelEvent::TransportOpened);
        assert_eq!(student.step(90_000), Vec::new());
    }

    #[test]
    fn exhausted_channel_accepts_a_manual_reconnect() {
        let mut channel = exam_channel();
        channel.connect();
        let mut now = 0;
        for _ in 0..6 {
            close(&mut channel, now);
            now += 20_000;
            channel.step(now);
        }
        assert_eq!(channel.phase(), ChannelPhase::Exhausted);

        let actions = channel.connect();
        assert_eq!(actions, vec![ChannelAction::TransportConnect]);
        assert_eq!(channel.reconnect_attempts(), 0);
    }

    #[test]
    fn decode_ignores_garbage() {
        use vigil_protocol::ExamServerMessage;
        assert_eq!(decode_inbound::<ExamServerMessage>("not json"), None);
        assert_eq!(
            decode_inbound::<ExamServerMessage>(r#"{"type":"connected"}"#),
            Some(ExamServerMessage::Connected)
        );
    }
}
