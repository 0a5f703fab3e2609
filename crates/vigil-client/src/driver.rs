//! Tokio drivers for the session and observer machines.
//!
//! The state machines are pure; these drivers supply the impure half: a
//! monotonic clock, the `vigil-io` endpoint, the camera collaborator, and a
//! poll loop with millisecond sleeps. All policy lives in the machines; the
//! drivers only translate endpoint states into events and actions into
//! endpoint calls.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use vigil_config::VigilConfig;
use vigil_io::{EndpointState, WsEndpoint, WsUrl};
use vigil_protocol::ObserverServerMessage;

use crate::channel::{
    decode_inbound, ChannelAction, ChannelEvent, ChannelPhase, ChannelRoute, ChannelStateMachine,
};
use crate::error::ClientError;
use crate::observer::{ObserverAggregator, RosterEntry};
use crate::session::{SessionAction, SessionController, SessionEvent, SessionInfo};
use crate::watchers::BrowserSignal;
use crate::NowMs;

const POLL_SLEEP: Duration = Duration::from_millis(1);

/// External camera collaborator. Implementations block briefly at most; the
/// cadence budget is 250ms per frame.
pub trait FrameSource: Send + 'static {
    /// Capture one JPEG-encoded frame.
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, ClientError>;
}

/// Out-of-band notifications surfaced to the embedding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverNotice {
    /// The telemetry channel opened (first connect or reconnect).
    Connected,
    /// The channel dropped; reconnection is in progress.
    ConnectionLost,
    /// All reconnect attempts failed; manual reconnect required.
    ReconnectExhausted,
    /// The risk level just entered danger; warn the student.
    DangerEntered,
}

/// Commands accepted by a running session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    /// Inject a browser environment observation.
    Browser(BrowserSignal),
    /// Stop proctoring and shut the driver down.
    Stop,
}

/// Handle for controlling a spawned driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::UnboundedSender<DriverCommand>,
}

impl DriverHandle {
    pub fn observe_browser(&self, signal: BrowserSignal) {
        let _ = self.commands.send(DriverCommand::Browser(signal));
    }

    pub fn stop(&self) {
        let _ = self.commands.send(DriverCommand::Stop);
    }
}

/// Runs one [`SessionController`] against a real endpoint and camera.
pub struct SessionDriver<F: FrameSource> {
    controller: SessionController,
    endpoint: WsEndpoint,
    frames: F,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    notices: mpsc::UnboundedSender<DriverNotice>,
    epoch: Instant,
    last_phase: ChannelPhase,
}

impl<F: FrameSource> SessionDriver<F> {
    /// Build a driver for one session. Returns the driver plus the control
    /// handle and the notice stream for the embedding UI.
    pub fn new(
        info: SessionInfo,
        config: &VigilConfig,
        frames: F,
    ) -> Result<(Self, DriverHandle, mpsc::UnboundedReceiver<DriverNotice>), ClientError> {
        let controller = SessionController::new(info, config);
        let url = session_url(config, controller.info())?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let driver = Self {
            controller,
            endpoint: WsEndpoint::new(url),
            frames,
            commands: command_rx,
            notices: notice_tx,
            epoch: Instant::now(),
            last_phase: ChannelPhase::Idle,
        };
        Ok((driver, DriverHandle { commands: command_tx }, notice_rx))
    }

    fn now_ms(&self) -> NowMs {
        self.epoch.elapsed().as_millis() as NowMs
    }

    /// Poll loop. Runs until a `Stop` command arrives, then executes the
    /// controller's stop contract before returning.
    pub async fn run(mut self) {
        let now = self.now_ms();
        let actions = self.controller.start(now);
        self.execute(actions);

        loop {
            match self.commands.try_recv() {
                Ok(DriverCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    let actions = self.controller.stop();
                    self.execute(actions);
                    return;
                }
                Ok(DriverCommand::Browser(signal)) => {
                    let now = self.now_ms();
                    let actions = self.controller.observe_browser(now, signal);
                    self.execute(actions);
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            self.pump_endpoint();

            let now = self.now_ms();
            let actions = self.controller.step(now);
            self.execute(actions);
            self.observe_phase();

            tokio::time::sleep(POLL_SLEEP).await;
        }
    }

    /// Translate endpoint observations into controller events.
    fn pump_endpoint(&mut self) {
        match self.endpoint.poll().clone() {
            EndpointState::ActiveHasData => {
                if let Ok(text) = self.endpoint.consume_message() {
                    let now = self.now_ms();
                    let actions = self
                        .controller
                        .handle(now, &SessionEvent::InboundText(text));
                    self.execute(actions);
                }
            }
            EndpointState::Errored(error) => {
                let now = self.now_ms();
                let _ = self.endpoint.confirm_error_and_close();
                let actions = self.controller.handle(
                    now,
                    &SessionEvent::Transport(ChannelEvent::TransportClosed {
                        reason: Some(error.to_string()),
                    }),
                );
                self.execute(actions);
                let _ = self.notices.send(DriverNotice::ConnectionLost);
            }
            EndpointState::ActiveWaiting | EndpointState::Inactive => {}
        }
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut queue: VecDeque<SessionAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Channel(ChannelAction::TransportConnect) => {
                    let now = self.now_ms();
                    let followups = match self.endpoint.request_connect() {
                        Ok(()) => {
                            let _ = self.notices.send(DriverNotice::Connected);
                            self.controller
                                .handle(now, &SessionEvent::Transport(ChannelEvent::TransportOpened))
                        }
                        Err(e) => {
                            debug!(error = %e, "connect attempt failed");
                            self.controller.handle(
                                now,
                                &SessionEvent::Transport(ChannelEvent::TransportClosed {
                                    reason: Some(e.to_string()),
                                }),
                            )
                        }
                    };
                    queue.extend(followups);
                }
                SessionAction::Channel(ChannelAction::TransportSend { text }) => {
                    if let Err(e) = self.endpoint.send_text(&text) {
                        // Endpoint is now Errored; the next pump closes it.
                        warn!(error = %e, "telemetry send failed");
                    }
                }
                SessionAction::Channel(ChannelAction::TransportClose) => {
                    if self.endpoint.poll().is_active() {
                        let _ = self.endpoint.request_disconnect();
                    }
                }
                SessionAction::CaptureFrame => match self.frames.capture_jpeg() {
                    Ok(bytes) => {
                        let data = format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes));
                        queue.extend(self.controller.submit_frame(data));
                    }
                    Err(e) => {
                        warn!(error = %e, "frame capture failed, skipping tick");
                    }
                },
                SessionAction::NotifyDanger => {
                    let _ = self.notices.send(DriverNotice::DangerEntered);
                }
            }
        }
    }

    fn observe_phase(&mut self) {
        let phase = self.controller.channel_phase();
        if phase != self.last_phase && phase == ChannelPhase::Exhausted {
            let _ = self.notices.send(DriverNotice::ReconnectExhausted);
        }
        self.last_phase = phase;
    }
}

/// Runs the observer channel and publishes roster snapshots.
pub struct ObserverDriver {
    channel: ChannelStateMachine,
    aggregator: ObserverAggregator,
    endpoint: WsEndpoint,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    roster: watch::Sender<Vec<RosterEntry>>,
    epoch: Instant,
}

impl ObserverDriver {
    pub fn new(
        exam_id: String,
        config: &VigilConfig,
    ) -> Result<(Self, DriverHandle, watch::Receiver<Vec<RosterEntry>>), ClientError> {
        let route = ChannelRoute::Observer { exam_id };
        let url = observer_url(config, &route)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (roster_tx, roster_rx) = watch::channel(Vec::new());
        let driver = Self {
            channel: ChannelStateMachine::new(route, &config.channel),
            aggregator: ObserverAggregator::new(&config.channel),
            endpoint: WsEndpoint::new(url),
            commands: command_rx,
            roster: roster_tx,
            epoch: Instant::now(),
        };
        Ok((driver, DriverHandle { commands: command_tx }, roster_rx))
    }

    fn now_ms(&self) -> NowMs {
        self.epoch.elapsed().as_millis() as NowMs
    }

    pub async fn run(mut self) {
        let actions = self.channel.connect();
        self.execute(actions);

        loop {
            match self.commands.try_recv() {
                Ok(DriverCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    let actions = self.channel.disconnect();
                    self.execute(actions);
                    return;
                }
                // Browser signals are a student-side concern.
                Ok(DriverCommand::Browser(_)) => {}
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            self.pump_endpoint();

            let now = self.now_ms();
            let actions = self.channel.step(now);
            self.execute(actions);

            self.aggregator.sweep(now);
            self.publish();

            tokio::time::sleep(POLL_SLEEP).await;
        }
    }

    fn pump_endpoint(&mut self) {
        match self.endpoint.poll().clone() {
            EndpointState::ActiveHasData => {
                if let Ok(text) = self.endpoint.consume_message() {
                    if let Some(message) = decode_inbound::<ObserverServerMessage>(&text) {
                        let now = self.now_ms();
                        self.aggregator.handle(now, &message);
                    }
                }
            }
            EndpointState::Errored(error) => {
                let now = self.now_ms();
                let _ = self.endpoint.confirm_error_and_close();
                let actions = self.channel.handle(
                    now,
                    &ChannelEvent::TransportClosed {
                        reason: Some(error.to_string()),
                    },
                );
                self.execute(actions);
            }
            EndpointState::ActiveWaiting | EndpointState::Inactive => {}
        }
    }

    fn execute(&mut self, actions: Vec<ChannelAction>) {
        let mut queue: VecDeque<ChannelAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                ChannelAction::TransportConnect => {
                    let now = self.now_ms();
                    let followups = match self.endpoint.request_connect() {
                        Ok(()) => self.channel.handle(now, &ChannelEvent::TransportOpened),
                        Err(e) => {
                            debug!(error = %e, "observer connect attempt failed");
                            self.channel.handle(
                                now,
                                &ChannelEvent::TransportClosed {
                                    reason: Some(e.to_string()),
                                },
                            )
                        }
                    };
                    queue.extend(followups);
                }
                ChannelAction::TransportSend { text } => {
                    if let Err(e) = self.endpoint.send_text(&text) {
                        warn!(error = %e, "observer send failed");
                    }
                }
                ChannelAction::TransportClose => {
                    if self.endpoint.poll().is_active() {
                        let _ = self.endpoint.request_disconnect();
                    }
                }
            }
        }
    }

    fn publish(&mut self) {
        let snapshot = self.aggregator.roster().to_vec();
        self.roster.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

fn session_url(config: &VigilConfig, info: &SessionInfo) -> Result<WsUrl, ClientError> {
    let route = ChannelRoute::Exam {
        session_id: info.session_id.clone(),
    };
    let base = WsUrl::new(&config.service.ws_base)?;
    Ok(base.join(&route.path())?)
}

fn observer_url(config: &VigilConfig, route: &ChannelRoute) -> Result<WsUrl, ClientError> {
    let base = WsUrl::new(&config.service.ws_base)?;
    Ok(base.join(&route.path())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SolidGray;

    impl FrameSource for SolidGray {
        fn capture_jpeg(&mut self) -> Result<Vec<u8>, ClientError> {
            Ok(vec![0x7f; 32])
        }
    }

    fn config_for(port: u16) -> VigilConfig {
        let mut config = VigilConfig::default();
        config.service.ws_base = format!("ws://127.0.0.1:{port}");
        config
    }

    fn session_info() -> SessionInfo {
        SessionInfo {
            session_id: "s-1".into(),
            student_id: "u-1".into(),
            exam_id: "e-1".into(),
            started_at_ms: 0,
        }
    }

    #[test]
    fn session_url_includes_the_route_path() {
        let url = session_url(&config_for(9000), &session_info()).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/ws/exam/s-1");
    }

    #[tokio::test]
    async fn stop_command_terminates_the_loop() {
        // No service listening: the driver cycles through failed connects
        // until told to stop.
        let (driver, handle, _notices) =
            SessionDriver::new(session_info(), &config_for(1), SolidGray).unwrap();
        let task = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("driver did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn observer_driver_stops_on_command() {
        let (driver, handle, roster) =
            ObserverDriver::new("e-1".into(), &config_for(1)).unwrap();
        assert!(roster.borrow().is_empty());
        let task = tokio::spawn(driver.run());
        handle.stop();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("driver did not stop")
            .unwrap();
    }
}
