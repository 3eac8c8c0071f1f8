//! # Gamepad Device Module
//!
//! The seam between the session loop and the evdev device.
//!
//! [`GamepadDevice`] is one open controller, [`DeviceBackend`] finds and opens
//! controllers. The evdev implementations read through the kernel's event
//! stream, so waiting for input costs no wake-ups.

use async_trait::async_trait;
use evdev::{Device, EventStream, FFEffectData, FFEffectKind, FFReplay, FFTrigger};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::heartbeat::RumbleEffect;
use super::locator::DeviceLocator;
use super::translator::RawEvent;
use crate::error::{BridgeError, Result};

/// One open controller, owned by the session that opened it.
#[async_trait]
pub trait GamepadDevice: Send {
    /// Path the device was opened from.
    fn path(&self) -> &Path;

    /// Wait for the next input event.
    ///
    /// `WouldBlock` means "nothing yet"; any other error means the device is gone.
    async fn next_event(&mut self) -> io::Result<RawEvent>;

    /// Play a rumble effect and remove it once it has finished.
    async fn rumble(&mut self, effect: &RumbleEffect) -> io::Result<()>;
}

/// Finds and opens controllers.
pub trait DeviceBackend: Send {
    type Device: GamepadDevice;

    /// Name being searched for, for log messages.
    fn target(&self) -> &str;

    /// Path of a matching device, `None` if nothing is connected.
    fn locate(&self) -> Result<Option<PathBuf>>;

    /// Open the device at `path` for reading events and playing effects.
    fn open(&self, path: &Path) -> Result<Self::Device>;
}

/// Controller opened through evdev.
pub struct EvdevGamepad {
    stream: EventStream,
    path: PathBuf,
}

impl std::fmt::Debug for EvdevGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevGamepad")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EvdevGamepad {
    /// Open `path` read/write and switch it to async, non-blocking reads.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the node cannot be opened or registered with
    /// the runtime.
    pub fn open(path: &Path) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            BridgeError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let stream = device.into_event_stream().map_err(|e| {
            BridgeError::Controller(format!(
                "Failed to create event stream for {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            stream,
            path: path.to_path_buf(),
        })
    }

    /// Human-readable device name.
    pub fn name(&self) -> Option<&str> {
        self.stream.device().name()
    }
}

#[async_trait]
impl GamepadDevice for EvdevGamepad {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn next_event(&mut self) -> io::Result<RawEvent> {
        let event = self.stream.next_event().await?;
        Ok(RawEvent::from(&event))
    }

    async fn rumble(&mut self, effect: &RumbleEffect) -> io::Result<()> {
        let data = FFEffectData {
            direction: 0,
            trigger: FFTrigger {
                button: 0,
                interval: 0,
            },
            replay: FFReplay {
                length: effect.duration_ms(),
                delay: 0,
            },
            kind: FFEffectKind::Rumble {
                strong_magnitude: effect.strong_magnitude,
                weak_magnitude: effect.weak_magnitude,
            },
        };

        let mut uploaded = self.stream.device_mut().upload_ff_effect(data)?;
        uploaded.play(1)?;
        tokio::time::sleep(effect.duration).await;
        // dropping the handle removes the effect from the device
        drop(uploaded);

        debug!("Rumble pulse on {}", self.path.display());
        Ok(())
    }
}

/// evdev-backed [`DeviceBackend`] driven by a [`DeviceLocator`].
#[derive(Debug, Clone, Default)]
pub struct EvdevBackend {
    locator: DeviceLocator,
}

impl EvdevBackend {
    pub fn new(locator: DeviceLocator) -> Self {
        Self { locator }
    }
}

impl DeviceBackend for EvdevBackend {
    type Device = EvdevGamepad;

    fn target(&self) -> &str {
        self.locator.target_name()
    }

    fn locate(&self) -> Result<Option<PathBuf>> {
        self.locator.locate()
    }

    fn open(&self, path: &Path) -> Result<EvdevGamepad> {
        EvdevGamepad::open(path)
    }
}

#[cfg(test)]
pub mod mocks {
    //! Scripted devices for exercising the session loop without hardware.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    /// One scripted read: wait `after`, then yield `result`.
    #[derive(Debug, Clone)]
    pub struct ScriptedRead {
        pub after: Duration,
        pub result: std::result::Result<RawEvent, io::ErrorKind>,
    }

    impl ScriptedRead {
        pub fn event(after: Duration, event: RawEvent) -> Self {
            Self {
                after,
                result: Ok(event),
            }
        }

        pub fn error(after: Duration, kind: io::ErrorKind) -> Self {
            Self {
                after,
                result: Err(kind),
            }
        }
    }

    /// Device replaying a script. Once the script runs out it never yields again.
    pub struct MockGamepad {
        pub path: PathBuf,
        pub script: VecDeque<ScriptedRead>,
        pub pulses: Arc<Mutex<Vec<Instant>>>,
        pub rumble_error: Option<io::ErrorKind>,
    }

    impl MockGamepad {
        pub fn new(path: &str, script: Vec<ScriptedRead>) -> Self {
            Self {
                path: PathBuf::from(path),
                script: script.into(),
                pulses: Arc::new(Mutex::new(Vec::new())),
                rumble_error: None,
            }
        }
    }

    #[async_trait]
    impl GamepadDevice for MockGamepad {
        fn path(&self) -> &Path {
            &self.path
        }

        async fn next_event(&mut self) -> io::Result<RawEvent> {
            let Some(read) = self.script.front().cloned() else {
                return std::future::pending().await;
            };

            // sleep before popping so a cancelled read is replayed intact
            tokio::time::sleep(read.after).await;
            self.script.pop_front();
            read.result.map_err(|kind| io::Error::new(kind, "scripted read error"))
        }

        async fn rumble(&mut self, effect: &RumbleEffect) -> io::Result<()> {
            self.pulses.lock().push(Instant::now());
            if let Some(kind) = self.rumble_error {
                return Err(io::Error::new(kind, "rumble not supported"));
            }
            tokio::time::sleep(effect.duration).await;
            Ok(())
        }
    }

    /// Backend whose device can be plugged and unplugged by the test.
    #[derive(Clone)]
    pub struct MockBackend {
        pub path: PathBuf,
        pub present: Arc<Mutex<bool>>,
        pub locate_fails: Arc<Mutex<bool>>,
        pub open_fails: Arc<Mutex<bool>>,
        pub sessions: Arc<Mutex<VecDeque<Vec<ScriptedRead>>>>,
        pub opened: Arc<Mutex<Vec<PathBuf>>>,
        pub pulses: Arc<Mutex<Vec<Instant>>>,
    }

    impl MockBackend {
        pub fn new(path: &str) -> Self {
            Self {
                path: PathBuf::from(path),
                present: Arc::new(Mutex::new(false)),
                locate_fails: Arc::new(Mutex::new(false)),
                open_fails: Arc::new(Mutex::new(false)),
                sessions: Arc::new(Mutex::new(VecDeque::new())),
                opened: Arc::new(Mutex::new(Vec::new())),
                pulses: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn set_present(&self, present: bool) {
            *self.present.lock() = present;
        }

        pub fn push_session(&self, script: Vec<ScriptedRead>) {
            self.sessions.lock().push_back(script);
        }
    }

    impl DeviceBackend for MockBackend {
        type Device = MockGamepad;

        fn target(&self) -> &str {
            "Mock Controller"
        }

        fn locate(&self) -> Result<Option<PathBuf>> {
            if *self.locate_fails.lock() {
                return Err(BridgeError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "cannot read /dev/input",
                )));
            }
            Ok(self.present.lock().then(|| self.path.clone()))
        }

        fn open(&self, path: &Path) -> Result<MockGamepad> {
            if *self.open_fails.lock() {
                return Err(BridgeError::Controller(format!(
                    "Failed to open {}: permission denied",
                    path.display()
                )));
            }

            self.opened.lock().push(path.to_path_buf());
            let script = self.sessions.lock().pop_front().unwrap_or_default();
            let mut device = MockGamepad::new(&path.to_string_lossy(), script);
            device.pulses = self.pulses.clone();
            Ok(device)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;
    use crate::controller::translator::EventKind;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_mock_gamepad_replays_script() {
        let ev = RawEvent::new(EventKind::Key, 0x130, 1);
        let mut device = MockGamepad::new(
            "/dev/input/event4",
            vec![
                ScriptedRead::event(Duration::from_millis(5), ev),
                ScriptedRead::error(Duration::ZERO, io::ErrorKind::WouldBlock),
            ],
        );

        assert_eq!(device.next_event().await.unwrap(), ev);
        assert_eq!(
            device.next_event().await.unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );
        assert!(
            tokio::time::timeout(Duration::from_secs(10), device.next_event())
                .await
                .is_err(),
            "exhausted script should never yield"
        );
    }

    #[test]
    fn test_open_nonexistent_device_fails() {
        match EvdevGamepad::open(Path::new("/dev/input/nonexistent_event_12345")) {
            Err(BridgeError::Controller(msg)) => {
                assert!(msg.contains("nonexistent_event_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    #[test]
    fn test_evdev_backend_target() {
        let backend = EvdevBackend::default();
        assert_eq!(backend.target(), "Xbox Wireless Controller");
    }
}
