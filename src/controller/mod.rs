//! # Controller Module
//!
//! Gamepad input handling for the input bridge.
//!
//! This module handles:
//! - Locating the controller by name among the evdev nodes
//! - Streaming its events and reconnecting after it drops out
//! - Translating axis and button events into OSC parameter messages
//! - A periodic rumble heartbeat that keeps the controller awake

pub mod device;
pub mod heartbeat;
pub mod locator;
pub mod session;
pub mod translator;

pub use device::{DeviceBackend, EvdevBackend, EvdevGamepad, GamepadDevice};
pub use heartbeat::{Heartbeat, RumbleEffect};
pub use locator::DeviceLocator;
pub use session::{InputSession, SessionState};
pub use translator::{EventMap, EventTranslator, RawEvent};
