//! Fixed-cadence frame capture scheduling.

use vigil_config::CaptureConfig;

use crate::NowMs;

/// Decides when the next camera frame is due.
///
/// Cadence is wall-clock driven and independent of render cycles or inbound
/// traffic. The scheduler never captures anything itself; the controller asks
/// [`poll_due`](Self::poll_due) and the driver does the capturing.
#[derive(Debug)]
pub struct CaptureScheduler {
    interval_ms: u64,
    last_capture_at_ms: Option<NowMs>,
    running: bool,
}

impl CaptureScheduler {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            interval_ms: config.frame_interval_ms,
            last_capture_at_ms: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the cadence. The first frame is due one full interval after
    /// start, not immediately.
    pub fn start(&mut self, now_ms: NowMs) {
        self.running = true;
        self.last_capture_at_ms = Some(now_ms);
    }

    /// Stop deterministically: no capture fires after this returns.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_capture_at_ms = None;
    }

    /// True when a frame is due. Consuming: the cadence anchor moves to
    /// `now_ms`, so a late poll yields one capture, not a burst.
    pub fn poll_due(&mut self, now_ms: NowMs) -> bool {
        if !self.running {
            return false;
        }
        match self.last_capture_at_ms {
            Some(last) if now_ms.saturating_sub(last) >= self.interval_ms => {
                self.last_capture_at_ms = Some(now_ms);
                true
            }
            Some(_) => false,
            None => {
                self.last_capture_at_ms = Some(now_ms);
                false
            }
        }
    }
}
