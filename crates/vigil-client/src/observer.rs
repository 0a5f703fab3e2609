//! Observer-side roster aggregation.
//!
//! The observer channel multiplexes every student in an exam over one
//! connection. This module folds that stream into a roster keyed by session
//! id, with a disconnect grace window so a student mid-reconnect flickers to
//! "disconnected" instead of vanishing from the dashboard.

use tracing::{debug, info};

use vigil_config::ChannelConfig;
use vigil_protocol::{AlertLevel, ObserverServerMessage, WireEvent};

use crate::NowMs;

/// One student's row on the observer dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub session_id: String,
    pub student_id: String,
    pub student_name: String,
    pub score: f64,
    pub alert_level: AlertLevel,
    pub connected: bool,
    pub recent_events: Vec<WireEvent>,
    pub annotated_frame: Option<String>,
    /// Armed while the entry is in its disconnect grace window.
    remove_at_ms: Option<NowMs>,
}

impl RosterEntry {
    fn new(session_id: String, student_id: String, student_name: String) -> Self {
        Self {
            session_id,
            student_id,
            student_name,
            score: 0.0,
            alert_level: AlertLevel::Normal,
            connected: true,
            recent_events: Vec::new(),
            annotated_frame: None,
            remove_at_ms: None,
        }
    }

    /// Any live message for this session supersedes a pending removal.
    fn revive(&mut self) {
        self.connected = true;
        self.remove_at_ms = None;
    }
}

/// Folds the observer channel's message stream into a roster.
#[derive(Debug, Default)]
pub struct ObserverAggregator {
    grace_ms: u64,
    exam_id: Option<String>,
    roster: Vec<RosterEntry>,
}

impl ObserverAggregator {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            grace_ms: config.roster_grace_ms,
            exam_id: None,
            roster: Vec::new(),
        }
    }

    pub fn exam_id(&self) -> Option<&str> {
        self.exam_id.as_deref()
    }

    /// Roster rows in arrival order.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn get(&self, session_id: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.session_id == session_id)
    }

    /// Fold one observer-channel message in.
    pub fn handle(&mut self, now_ms: NowMs, message: &ObserverServerMessage) {
        match message {
            ObserverServerMessage::InitialState {
                exam_id,
                active_sessions,
            } => {
                // Authoritative snapshot: replaces anything accumulated.
                self.exam_id = exam_id.clone();
                self.roster = active_sessions
                    .iter()
                    .map(|s| RosterEntry {
                        score: s.current_score,
                        alert_level: AlertLevel::from_score(s.current_score),
                        ..RosterEntry::new(
                            s.session_id.clone(),
                            s.student_id.clone(),
                            s.student_name.clone(),
                        )
                    })
                    .collect();
                info!(sessions = self.roster.len(), "observer roster initialized");
            }
            ObserverServerMessage::StudentConnected {
                session_id,
                student_id,
                student_name,
            } => {
                if let Some(entry) = self.get_mut(session_id) {
                    entry.student_id = student_id.clone();
                    entry.student_name = student_name.clone();
                    entry.revive();
                } else {
                    self.roster.push(RosterEntry::new(
                        session_id.clone(),
                        student_id.clone(),
                        student_name.clone(),
                    ));
                }
                debug!(session_id, "student connected");
            }
            ObserverServerMessage::StudentDisconnected { session_id } => {
                let grace_ms = self.grace_ms;
                if let Some(entry) = self.get_mut(session_id) {
                    entry.connected = false;
                    entry.remove_at_ms = Some(now_ms + grace_ms);
                    debug!(session_id, grace_ms, "student disconnected, grace armed");
                }
            }
            ObserverServerMessage::StudentUpdate(update) => {
                let Some(entry) = self.get_mut(&update.session_id) else {
                    // Updates for sessions we never saw join are dropped.
                    debug!(session_id = %update.session_id, "update for unknown session");
                    return;
                };
                entry.revive();
                if let Some(score) = update.score {
                    entry.score = score;
                    entry.alert_level = AlertLevel::from_score(score);
                }
                if let Some(level) = update.alert_level {
                    entry.alert_level = level;
                }
                if let Some(events) = &update.recent_events {
                    entry.recent_events = events.clone();
                }
                if update.annotated_frame.is_some() {
                    entry.annotated_frame = update.annotated_frame.clone();
                }
            }
            ObserverServerMessage::Pong | ObserverServerMessage::Unknown => {}
        }
    }

    /// Remove entries whose disconnect grace has lapsed.
    pub fn sweep(&mut self, now_ms: NowMs) {
        self.roster.retain(|entry| {
            let expired = entry.remove_at_ms.is_some_and(|at| now_ms >= at);
            if expired {
                debug!(session_id = %entry.session_id, "roster entry removed after grace");
            }
            !expired
        });
    }

    fn get_mut(&mut self, session_id: &str) -> Option<&mut RosterEntry> {
        self.roster.iter_mut().find(|e| e.session_id == session_id)
    }
}
