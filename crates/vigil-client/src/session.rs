//! Session controller: one exam attempt end to end.
//!
//! Composes the channel state machine, the risk machine, and the capture
//! scheduler for a single student session, fanning their concerns into one
//! action list for the driver. Pure like its parts: the driver supplies
//! `now_ms` and executes actions.

use tracing::{debug, info};

use vigil_config::VigilConfig;
use vigil_protocol::ExamServerMessage;

use crate::channel::{
    decode_inbound, ChannelAction, ChannelEvent, ChannelPhase, ChannelRoute, ChannelStateMachine,
};
use crate::risk::{RiskMachine, RiskSignal, RiskState};
use crate::scheduler::CaptureScheduler;
use crate::watchers::BrowserSignal;
use crate::NowMs;

/// Identity of one proctored exam attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub student_id: String,
    pub exam_id: String,
    pub started_at_ms: NowMs,
}

/// Inputs fed in by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport lifecycle observation for the session channel.
    Transport(ChannelEvent),
    /// One raw inbound text message.
    InboundText(String),
}

/// Actions for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Transport work delegated to the channel's endpoint.
    Channel(ChannelAction),
    /// Capture one camera frame and feed it back via `submit_frame`.
    CaptureFrame,
    /// Surface the entered-danger warning to the student.
    NotifyDanger,
}

/// Drives one exam attempt: connection intent, risk folding, frame cadence.
#[derive(Debug)]
pub struct SessionController {
    info: SessionInfo,
    channel: ChannelStateMachine,
    risk: RiskMachine,
    scheduler: CaptureScheduler,
}

impl SessionController {
    pub fn new(info: SessionInfo, config: &VigilConfig) -> Self {
        let route = ChannelRoute::Exam {
            session_id: info.session_id.clone(),
        };
        Self {
            info,
            channel: ChannelStateMachine::new(route, &config.channel),
            risk: RiskMachine::new(&config.risk),
            scheduler: CaptureScheduler::new(&config.capture),
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn risk_state(&self) -> &RiskState {
        self.risk.state()
    }

    pub fn channel_phase(&self) -> ChannelPhase {
        self.channel.phase()
    }

    /// Begin proctoring: connect the channel and arm the frame cadence.
    pub fn start(&mut self, now_ms: NowMs) -> Vec<SessionAction> {
        info!(
            session_id = %self.info.session_id,
            exam_id = %self.info.exam_id,
            "session starting"
        );
        self.scheduler.start(now_ms);
        wrap(self.channel.connect())
    }

    /// End proctoring. All four legs happen before returning, in order:
    /// cadence stops, the pending violation clear is disarmed, the manual
    /// close flag is set, and the transport is told to close. No reconnect
    /// can fire afterwards.
    pub fn stop(&mut self) -> Vec<SessionAction> {
        info!(session_id = %self.info.session_id, "session stopping");
        self.scheduler.stop();
        self.risk.cancel_violation_clear();
        wrap(self.channel.disconnect())
    }

    /// Advance time-driven behavior: reconnect resumption, violation expiry,
    /// and the frame cadence. Frames are only requested while the channel is
    /// open; a due tick during an outage is skipped, not queued.
    pub fn step(&mut self, now_ms: NowMs) -> Vec<SessionAction> {
        let mut actions = wrap(self.channel.step(now_ms));
        self.risk.tick(now_ms);
        if self.scheduler.poll_due(now_ms) && self.channel.is_open() {
            actions.push(SessionAction::CaptureFrame);
        }
        actions
    }

    /// Apply one driver-observed event.
    pub fn handle(&mut self, now_ms: NowMs, event: &SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Transport(transport) => {
                let actions = wrap(self.channel.handle(now_ms, transport));
                self.risk.set_connected(self.channel.is_open());
                actions
            }
            SessionEvent::InboundText(text) => self.handle_inbound(now_ms, text),
        }
    }

    /// Submit one captured frame, already encoded as a data URL.
    pub fn submit_frame(&mut self, data: String) -> Vec<SessionAction> {
        wrap(self.channel.send_frame(data))
    }

    /// Inject a browser environment observation: recorded locally and, when
    /// the channel is open, reported to the service.
    pub fn observe_browser(&mut self, now_ms: NowMs, signal: BrowserSignal) -> Vec<SessionAction> {
        let kind = signal.violation_kind();
        debug!(session_id = %self.info.session_id, kind = %kind, "browser signal");
        self.risk
            .record_browser_event(now_ms, kind.clone(), signal.level(), None);
        wrap(self.channel.send_event(kind, None))
    }

    fn handle_inbound(&mut self, now_ms: NowMs, text: &str) -> Vec<SessionAction> {
        let Some(message) = decode_inbound::<ExamServerMessage>(text) else {
            return Vec::new();
        };
        match message {
            ExamServerMessage::Result(payload) => {
                match self.risk.apply_result(now_ms, &payload) {
                    Some(RiskSignal::DangerEntered) => vec![SessionAction::NotifyDanger],
                    None => Vec::new(),
                }
            }
            ExamServerMessage::Connected | ExamServerMessage::Pong | ExamServerMessage::Unknown => {
                Vec::new()
            }
        }
    }
}

fn wrap(actions: Vec<ChannelAction>) -> Vec<SessionAction> {
    actions.into_iter().map(SessionAction::Channel).collect()
}
