//! # Input Session Module
//!
//! The reconnecting loop that owns the gamepad.
//!
//! ## States
//!
//! ```text
//! Searching ──found──▶ Connecting ──opened──▶ Streaming
//!     ▲                    │                      │
//!     └──── open failed ───┘                      │
//!     └──────────────── read error ───────────────┘
//! ```
//!
//! Searching and failed opens wait the retry delay (3 s by default) before
//! the next attempt. While streaming, the loop waits for the next event at
//! most until the heartbeat is due, so there is no idle polling.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::device::{DeviceBackend, GamepadDevice};
use super::heartbeat::Heartbeat;
use super::translator::EventTranslator;
use crate::osc::MessageSink;

/// Default delay between search and open attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Shortest event wait, so a heartbeat exactly at its deadline cannot spin.
const MIN_EVENT_WAIT: Duration = Duration::from_millis(1);

/// Where the session currently is.
pub enum SessionState<D> {
    /// No device; looking for one.
    Searching,
    /// A matching device was found at this path.
    Connecting(PathBuf),
    /// Device open and forwarding events.
    Streaming(D),
}

impl<D> SessionState<D> {
    /// Short state name for logs and assertions.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Searching => "searching",
            SessionState::Connecting(_) => "connecting",
            SessionState::Streaming(_) => "streaming",
        }
    }
}

impl<D> std::fmt::Debug for SessionState<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting(path) => write!(f, "Connecting({})", path.display()),
            other => f.write_str(other.name()),
        }
    }
}

/// Input session: device discovery, streaming and reconnection.
pub struct InputSession<B, S> {
    backend: B,
    translator: EventTranslator<S>,
    heartbeat: Heartbeat,
    retry_delay: Duration,
    events_forwarded: u64,
}

impl<B, S> InputSession<B, S>
where
    B: DeviceBackend,
    S: MessageSink,
{
    pub fn new(
        backend: B,
        translator: EventTranslator<S>,
        heartbeat: Heartbeat,
        retry_delay: Duration,
    ) -> Self {
        Self {
            backend,
            translator,
            heartbeat,
            retry_delay,
            events_forwarded: 0,
        }
    }

    /// Number of events forwarded since startup.
    pub fn events_forwarded(&self) -> u64 {
        self.events_forwarded
    }

    /// Run the state machine forever.
    pub async fn run(&mut self) {
        let mut state = SessionState::Searching;
        loop {
            state = self.step(state).await;
        }
    }

    /// Perform one state transition.
    ///
    /// `Streaming` only returns once the device has disconnected.
    pub async fn step(&mut self, state: SessionState<B::Device>) -> SessionState<B::Device> {
        match state {
            SessionState::Searching => match self.backend.locate() {
                Ok(Some(path)) => SessionState::Connecting(path),
                Ok(None) => {
                    info!("Searching for {}...", self.backend.target());
                    tokio::time::sleep(self.retry_delay).await;
                    SessionState::Searching
                }
                Err(e) => {
                    warn!("Device search failed: {}", e);
                    tokio::time::sleep(self.retry_delay).await;
                    SessionState::Searching
                }
            },

            SessionState::Connecting(path) => match self.backend.open(&path) {
                Ok(device) => {
                    info!("Connected to {}", path.display());
                    SessionState::Streaming(device)
                }
                Err(e) => {
                    warn!("{}", e);
                    tokio::time::sleep(self.retry_delay).await;
                    SessionState::Searching
                }
            },

            SessionState::Streaming(mut device) => {
                let error = self.stream(&mut device).await;
                info!("Controller disconnected ({}): {}", device.path().display(), error);
                drop(device);
                SessionState::Searching
            }
        }
    }

    /// Forward events until a read fails with anything but `WouldBlock`.
    async fn stream(&mut self, device: &mut B::Device) -> io::Error {
        loop {
            self.heartbeat.fire_if_due(device).await;

            let wait = self.heartbeat.time_until_due().max(MIN_EVENT_WAIT);
            match timeout(wait, device.next_event()).await {
                // heartbeat deadline reached, nothing read
                Err(_) => {}
                Ok(Ok(event)) => {
                    if self.translator.dispatch(&event).await {
                        self.events_forwarded += 1;
                    }
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!("Read would block");
                }
                Ok(Err(e)) => return e,
            }
        }
    }
}
