//! Client library for the vigil proctoring telemetry protocol.
//!
//! The core of this crate is a set of pure, deterministic state machines
//! layered above the poll-based `vigil-io` endpoint:
//!
//! - [`ChannelStateMachine`] — one logical duplex connection with the
//!   reconnect/backoff policy and manual-close semantics
//! - [`RiskMachine`] — cumulative score, derived alert level, violation
//!   windowing and expiry
//! - [`CaptureScheduler`] — fixed-cadence frame submission, decoupled from
//!   render cycles
//! - [`SessionController`] — composes the three for one exam attempt, plus
//!   browser-signal ([`BrowserSignal`]) injection
//! - [`ObserverAggregator`] — the teacher-side roster built from a
//!   multiplexed per-student stream
//!
//! Design constraints:
//! - No sleeps, no threads, no blocking waits
//! - No hardcoded timeouts/retries/backoff (policy comes from `vigil-config`)
//! - Runtime-agnostic: any driver that can execute Actions works; a Tokio
//!   driver ships in [`driver`]

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Milliseconds in a monotonic clock domain provided by the driver.
pub type NowMs = u64;

pub mod channel;
pub mod driver;
pub mod error;
pub mod observer;
pub mod rest;
pub mod risk;
pub mod scheduler;
pub mod session;
pub mod watchers;

pub use channel::{ChannelAction, ChannelEvent, ChannelPhase, ChannelRoute, ChannelStateMachine};
pub use driver::{
    DriverCommand, DriverHandle, DriverNotice, FrameSource, ObserverDriver, SessionDriver,
};
pub use error::ClientError;
pub use observer::{ObserverAggregator, RosterEntry};
pub use rest::{end_session, start_session, StartSessionRequest};
pub use risk::{RecordedEvent, RiskMachine, RiskSignal, RiskState};
pub use scheduler::CaptureScheduler;
pub use session::{SessionAction, SessionController, SessionEvent, SessionInfo};
pub use watchers::BrowserSignal;
