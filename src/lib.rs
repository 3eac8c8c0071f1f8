//! # RNBO Bridge Library
//!
//! Bridges a gamepad and a serial LED driver to an RNBO runner over OSC.
//!
//! Two independent bridges are built from this library:
//! - **gamepad-bridge**: evdev gamepad events → OSC parameter messages
//! - **serial-bridge**: OSC outport messages → 15-byte frames at 260 Hz

pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod logging;
pub mod osc;
pub mod router;
pub mod scheduler;
pub mod serial;
