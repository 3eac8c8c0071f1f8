//! # Shared Frame Buffer
//!
//! The 15-byte frame transmitted to the LED driver, shared between the OSC
//! listener (writer) and the transmission scheduler (reader).
//!
//! ## Frame Layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | Start marker `0xFE` |
//! | 1-13 | Payload slots 0-12 |
//! | 14 | End marker `0xFF` |
//!
//! Each slot write is atomic with respect to readers, but there is no
//! cross-slot atomicity: a snapshot may contain slots from different updates.

use parking_lot::Mutex;
use std::sync::Arc;

/// Start-of-frame marker.
pub const FRAME_START: u8 = 0xFE;

/// End-of-frame marker.
pub const FRAME_END: u8 = 0xFF;

/// Number of addressable payload slots.
pub const PAYLOAD_LEN: usize = 13;

/// Total frame length including markers.
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2;

/// Highest value that never collides with a framing marker.
pub const MAX_UNMARKED_VALUE: u8 = FRAME_START - 1;

/// A complete frame as written to the wire.
pub type Frame = [u8; FRAME_LEN];

/// Mutex-guarded frame buffer.
///
/// Cloning is cheap and yields another handle to the same buffer.
///
/// # Examples
///
/// ```
/// use rnbo_bridge::frame::{FrameBuffer, FRAME_END, FRAME_START};
///
/// let buffer = FrameBuffer::new();
/// assert!(buffer.write_slot(0, 42));
///
/// let frame = buffer.snapshot();
/// assert_eq!(frame[0], FRAME_START);
/// assert_eq!(frame[1], 42);
/// assert_eq!(frame[14], FRAME_END);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    inner: Arc<Mutex<Frame>>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Creates a buffer with an all-zero payload.
    #[must_use]
    pub fn new() -> Self {
        Self::with_payload(&[])
    }

    /// Creates a buffer seeded with initial payload values.
    ///
    /// Values beyond the 13th are ignored; missing values are zero.
    #[must_use]
    pub fn with_payload(initial: &[u8]) -> Self {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = FRAME_START;
        frame[FRAME_LEN - 1] = FRAME_END;
        for (slot, value) in initial.iter().take(PAYLOAD_LEN).enumerate() {
            frame[slot + 1] = *value;
        }

        Self {
            inner: Arc::new(Mutex::new(frame)),
        }
    }

    /// Writes one payload slot.
    ///
    /// Returns `false` without touching the buffer if `slot` is not in `0..13`.
    pub fn write_slot(&self, slot: usize, value: u8) -> bool {
        if slot >= PAYLOAD_LEN {
            return false;
        }

        self.inner.lock()[slot + 1] = value;
        true
    }

    /// Copies the whole frame out under the lock.
    #[must_use]
    pub fn snapshot(&self) -> Frame {
        *self.inner.lock()
    }

    /// Reads a single payload slot.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<u8> {
        if slot >= PAYLOAD_LEN {
            return None;
        }
        Some(self.inner.lock()[slot + 1])
    }
}
