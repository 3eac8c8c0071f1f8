//! # Heartbeat Module
//!
//! Keeps the wireless controller awake with a short rumble pulse.
//!
//! The pulse fires once the time since the previous one exceeds the interval
//! (60 s by default). It is checked from the session loop, so the interval is
//! a lower bound on pulse spacing, not a precise period.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::device::GamepadDevice;

/// Default time between pulses.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Default pulse length.
pub const DEFAULT_RUMBLE_DURATION: Duration = Duration::from_millis(200);

/// Default weak (high frequency) motor magnitude.
pub const DEFAULT_WEAK_MAGNITUDE: u16 = 0x2000;

/// Default strong (low frequency) motor magnitude.
pub const DEFAULT_STRONG_MAGNITUDE: u16 = 0x0000;

/// A timed rumble effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RumbleEffect {
    pub duration: Duration,
    pub weak_magnitude: u16,
    pub strong_magnitude: u16,
}

impl Default for RumbleEffect {
    fn default() -> Self {
        Self {
            duration: DEFAULT_RUMBLE_DURATION,
            weak_magnitude: DEFAULT_WEAK_MAGNITUDE,
            strong_magnitude: DEFAULT_STRONG_MAGNITUDE,
        }
    }
}

impl RumbleEffect {
    /// Replay length in the `u16` milliseconds evdev expects.
    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        u16::try_from(self.duration.as_millis()).unwrap_or(u16::MAX)
    }
}

/// Heartbeat timer and the effect it plays.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    effect: RumbleEffect,
    last: Instant,
}

impl Heartbeat {
    /// Starts the timer now; the first pulse is due one interval from now.
    #[must_use]
    pub fn new(interval: Duration, effect: RumbleEffect) -> Self {
        Self {
            interval,
            effect,
            last: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True once strictly more than one interval has passed since the last pulse.
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.last.elapsed() > self.interval
    }

    /// Time left until the pulse becomes due (zero if already due).
    #[must_use]
    pub fn time_until_due(&self) -> Duration {
        self.interval.saturating_sub(self.last.elapsed())
    }

    /// Play the pulse on `device` if it is due.
    ///
    /// Blocks the caller for the effect duration. A device that cannot rumble
    /// is not an error; the timer is reset either way.
    pub async fn fire_if_due<D: GamepadDevice + ?Sized>(&mut self, device: &mut D) -> bool {
        if !self.is_due() {
            return false;
        }

        let fired_at = Instant::now();
        if let Err(e) = device.rumble(&self.effect).await {
            debug!("Rumble not available on {}: {}", device.path().display(), e);
        }
        self.last = fired_at;
        true
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL, RumbleEffect::default())
    }
}
