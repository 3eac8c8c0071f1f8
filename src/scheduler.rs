//! # Transmission Scheduler
//!
//! Writes the shared frame to the LED driver at a fixed rate (260 Hz by
//! default), whether or not the payload changed.
//!
//! Ticks are scheduled against an accumulating deadline
//! (`next_tick += period`), so a slow write or a late wake-up shortens the
//! following sleep instead of shifting every later frame. Failed writes are
//! counted and logged; the loop never stops or backs off.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::frame::FrameBuffer;
use crate::serial::SerialPortIO;

/// Default frame rate in Hz
pub const DEFAULT_FRAME_RATE_HZ: u32 = 260;

/// Default number of frames between status log messages (~10 s at 260 Hz)
pub const DEFAULT_STATUS_INTERVAL_FRAMES: u64 = 2600;

/// Frame period for a rate in Hz, truncated to whole nanoseconds.
#[must_use]
pub fn frame_period(rate_hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(rate_hz.max(1)))
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmitStats {
    /// Frames written successfully
    pub sent: u64,
    /// Frames whose write failed
    pub failed: u64,
    /// Length of the current run of failures
    pub consecutive_failures: u64,
}

/// Fixed-rate frame writer.
pub struct TransmissionScheduler<P> {
    port: P,
    frame: FrameBuffer,
    period: Duration,
    status_interval: u64,
    stats: TransmitStats,
}

impl<P: SerialPortIO> TransmissionScheduler<P> {
    pub fn new(port: P, frame: FrameBuffer, rate_hz: u32) -> Self {
        Self {
            port,
            frame,
            period: frame_period(rate_hz),
            status_interval: DEFAULT_STATUS_INTERVAL_FRAMES,
            stats: TransmitStats::default(),
        }
    }

    /// Log a status line every `frames` frames (0 disables it).
    #[must_use]
    pub fn with_status_interval(mut self, frames: u64) -> Self {
        self.status_interval = frames;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }

    /// Run forever.
    pub async fn run(&mut self) {
        info!(
            "Starting frame transmission at {:.1}Hz",
            1.0 / self.period.as_secs_f64()
        );

        let mut next_tick = Instant::now();
        loop {
            self.tick(&mut next_tick).await;
        }
    }

    /// Transmit exactly `frames` frames on the same schedule as [`run`](Self::run).
    pub async fn run_frames(&mut self, frames: u64) {
        let mut next_tick = Instant::now();
        for _ in 0..frames {
            self.tick(&mut next_tick).await;
        }
    }

    async fn tick(&mut self, next_tick: &mut Instant) {
        self.transmit_once().await;
        self.log_status();

        *next_tick += self.period;
        sleep_until(*next_tick).await;
    }

    /// Snapshot the buffer and write it once.
    ///
    /// Returns `true` if the write and flush succeeded.
    pub async fn transmit_once(&mut self) -> bool {
        let frame = self.frame.snapshot();

        let result = match self.port.write_all(&frame).await {
            Ok(()) => self.port.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                if self.stats.consecutive_failures > 0 {
                    info!(
                        "Serial writes recovered after {} failed frames",
                        self.stats.consecutive_failures
                    );
                }
                self.stats.sent += 1;
                self.stats.consecutive_failures = 0;
                true
            }
            Err(e) => {
                self.stats.failed += 1;
                self.stats.consecutive_failures += 1;
                if self.stats.consecutive_failures == 1 {
                    warn!("Serial write error: {}", e);
                } else {
                    debug!("Serial write error: {}", e);
                }
                false
            }
        }
    }

    fn log_status(&self) {
        let total = self.stats.sent + self.stats.failed;
        if self.status_interval > 0 && total % self.status_interval == 0 {
            info!(
                "Transmitted {} frames ({} failed)",
                self.stats.sent, self.stats.failed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_END, FRAME_LEN, FRAME_START};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use std::io;

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(260), Duration::from_nanos(3_846_153));
        assert_eq!(frame_period(250), Duration::from_millis(4));
        assert_eq!(frame_period(1), Duration::from_secs(1));
        // rate 0 is treated as 1 Hz rather than dividing by zero
        assert_eq!(frame_period(0), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_full_frames() {
        let port = MockSerialPort::new();
        let frame = FrameBuffer::new();
        frame.write_slot(0, 90);
        frame.write_slot(12, 7);

        let mut scheduler = TransmissionScheduler::new(port.clone(), frame, DEFAULT_FRAME_RATE_HZ);
        scheduler.run_frames(3).await;

        let written = port.get_written_data();
        assert_eq!(written.len(), 3);
        for bytes in written {
            assert_eq!(bytes.len(), FRAME_LEN);
            assert_eq!(bytes[0], FRAME_START);
            assert_eq!(bytes[1], 90);
            assert_eq!(bytes[13], 7);
            assert_eq!(bytes[14], FRAME_END);
        }
        assert_eq!(scheduler.stats().sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_payload_is_still_sent_every_tick() {
        let port = MockSerialPort::new();
        let mut scheduler = TransmissionScheduler::new(port.clone(), FrameBuffer::new(), 260);

        let start = Instant::now();
        scheduler.run_frames(260).await;

        assert_eq!(port.get_written_data().len(), 260);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(999) && elapsed <= Duration::from_millis(1001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_converges_despite_stalls() {
        let port = MockSerialPort::new();
        // every 10th write takes two and a half periods
        port.stall_every(10, Duration::from_micros(9_600));

        let mut scheduler = TransmissionScheduler::new(port.clone(), FrameBuffer::new(), 260);
        let period = scheduler.period();

        let frames = 2000u64;
        let start = Instant::now();
        scheduler.run_frames(frames).await;
        let average = start.elapsed() / frames as u32;

        let tolerance = period / 100;
        assert!(
            average >= period - tolerance && average <= period + tolerance,
            "average {:?} not within 1% of {:?}",
            average,
            period
        );
        assert_eq!(port.get_written_data().len(), frames as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failures_do_not_stop_the_loop() {
        let port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);

        let mut scheduler = TransmissionScheduler::new(port.clone(), FrameBuffer::new(), 260);
        let start = Instant::now();
        scheduler.run_frames(100).await;

        let stats = scheduler.stats();
        assert_eq!(stats.failed, 100);
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.consecutive_failures, 100);
        // failures still run at full rate
        assert!(start.elapsed() >= scheduler.period() * 99);

        port.clear_write_error();
        scheduler.run_frames(5).await;
        let stats = scheduler.stats();
        assert_eq!(stats.sent, 5);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(port.get_written_data().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_failure_counts_as_failed_frame() {
        let port = MockSerialPort::new();
        port.set_flush_error(io::ErrorKind::TimedOut);

        let mut scheduler = TransmissionScheduler::new(port, FrameBuffer::new(), 260);
        assert!(!scheduler.transmit_once().await);
        assert_eq!(scheduler.stats().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_updates_land_in_later_frames() {
        let port = MockSerialPort::new();
        let frame = FrameBuffer::new();
        let mut scheduler =
            TransmissionScheduler::new(port.clone(), frame.clone(), 260).with_status_interval(0);

        scheduler.run_frames(1).await;
        frame.write_slot(3, 42);
        scheduler.run_frames(1).await;

        let written = port.get_written_data();
        assert_eq!(written[0][4], 0);
        assert_eq!(written[1][4], 42);
    }
}
