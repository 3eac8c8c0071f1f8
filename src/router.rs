//! # Inbound Message Router
//!
//! Binds RNBO outport addresses to payload slots of the [`FrameBuffer`].
//!
//! ## Default Routes
//!
//! | Slot | Address |
//! |------|---------|
//! | 0 | `/rnbo/inst/1/messages/out/brightness` |
//! | 1 | `/rnbo/inst/1/messages/out/radius` |
//! | 2 | `/rnbo/inst/1/messages/out/palette` |
//! | 3 | `/rnbo/inst/1/messages/out/divisionsHi` |
//! | 4 | `/rnbo/inst/1/messages/out/divisionsLo` |
//! | 5 | `/rnbo/inst/1/messages/out/width` |
//! | 6 | `/rnbo/inst/1/messages/out/curve` |
//! | 7 | `/rnbo/inst/1/messages/out/rotation` |
//! | 8 | `/rnbo/inst/1/messages/out/fadeIn` |
//! | 9 | `/rnbo/inst/1/messages/out/fadeOut` |
//! | 10 | `/rnbo/inst/1/messages/out/peakPosition` |
//! | 11 | `/rnbo/inst/1/messages/out/pattern` |
//! | 12 | `/rnbo/inst/1/messages/out/gradientOffset` |
//!
//! Every route expects exactly one numeric argument. `float`, `double` and
//! `int64` values are truncated to `int32` first, the way liblo coerces them
//! for an `"i"` method. Anything else is dropped.

use rosc::{OscMessage, OscPacket, OscType};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{trace, warn};

use crate::error::{BridgeError, Result};
use crate::frame::{FrameBuffer, MAX_UNMARKED_VALUE, PAYLOAD_LEN};

/// Default route table in slot order.
pub const DEFAULT_ROUTES: [(&str, usize); PAYLOAD_LEN] = [
    ("/rnbo/inst/1/messages/out/brightness", 0),
    ("/rnbo/inst/1/messages/out/radius", 1),
    ("/rnbo/inst/1/messages/out/palette", 2),
    ("/rnbo/inst/1/messages/out/divisionsHi", 3),
    ("/rnbo/inst/1/messages/out/divisionsLo", 4),
    ("/rnbo/inst/1/messages/out/width", 5),
    ("/rnbo/inst/1/messages/out/curve", 6),
    ("/rnbo/inst/1/messages/out/rotation", 7),
    ("/rnbo/inst/1/messages/out/fadeIn", 8),
    ("/rnbo/inst/1/messages/out/fadeOut", 9),
    ("/rnbo/inst/1/messages/out/peakPosition", 10),
    ("/rnbo/inst/1/messages/out/pattern", 11),
    ("/rnbo/inst/1/messages/out/gradientOffset", 12),
];

/// One `address -> slot` entry as it appears in configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    pub address: String,
    pub slot: usize,
}

/// The built-in bindings from [`DEFAULT_ROUTES`].
#[must_use]
pub fn default_route_bindings() -> Vec<RouteBinding> {
    DEFAULT_ROUTES
        .iter()
        .map(|(address, slot)| RouteBinding {
            address: address.to_string(),
            slot: *slot,
        })
        .collect()
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The slot was written.
    Applied { slot: usize, value: u8 },
    /// No route is bound to the address.
    Unrouted,
    /// The address is routed but the arguments are not a single number.
    Malformed,
}

/// Handler bound to one address: writes its slot of the shared frame.
#[derive(Debug, Clone)]
struct SlotRoute {
    slot: usize,
    frame: FrameBuffer,
    clamp: bool,
}

impl SlotRoute {
    fn apply(&self, value: i32) -> Dispatch {
        let byte = if self.clamp {
            value.clamp(0, i32::from(MAX_UNMARKED_VALUE)) as u8
        } else {
            // keep the low byte
            value as u8
        };

        if self.frame.write_slot(self.slot, byte) {
            Dispatch::Applied {
                slot: self.slot,
                value: byte,
            }
        } else {
            Dispatch::Unrouted
        }
    }
}

/// Numeric argument as `int32`, truncating toward zero.
fn as_int(arg: &OscType) -> Option<i32> {
    match arg {
        OscType::Int(v) => Some(*v),
        OscType::Long(v) => Some(*v as i32),
        OscType::Float(v) => Some(*v as i32),
        OscType::Double(v) => Some(*v as i32),
        _ => None,
    }
}

/// Routes inbound OSC messages into the frame buffer.
///
/// # Examples
///
/// ```
/// use rnbo_bridge::frame::FrameBuffer;
/// use rnbo_bridge::router::{Dispatch, Router};
/// use rosc::{OscMessage, OscType};
///
/// let frame = FrameBuffer::new();
/// let router = Router::with_default_routes(frame.clone());
///
/// let msg = OscMessage {
///     addr: "/rnbo/inst/1/messages/out/radius".to_string(),
///     args: vec![OscType::Int(253)],
/// };
/// assert_eq!(router.dispatch(&msg), Dispatch::Applied { slot: 1, value: 253 });
/// assert_eq!(frame.slot(1), Some(253));
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    frame: FrameBuffer,
    clamp: bool,
    routes: HashMap<String, SlotRoute>,
}

impl Router {
    /// Creates a router with no routes.
    ///
    /// When `clamp` is set, values are clamped to `0..=253` so payload bytes
    /// never look like a framing marker. Otherwise the low byte is kept.
    #[must_use]
    pub fn new(frame: FrameBuffer, clamp: bool) -> Self {
        Self {
            frame,
            clamp,
            routes: HashMap::new(),
        }
    }

    /// Creates a router over the 13 built-in routes, truncating values.
    #[must_use]
    pub fn with_default_routes(frame: FrameBuffer) -> Self {
        let routes = DEFAULT_ROUTES
            .iter()
            .map(|(address, slot)| {
                (
                    address.to_string(),
                    SlotRoute {
                        slot: *slot,
                        frame: frame.clone(),
                        clamp: false,
                    },
                )
            })
            .collect();

        Self {
            frame,
            clamp: false,
            routes,
        }
    }

    /// Creates a router from an ordered binding list.
    ///
    /// # Errors
    ///
    /// Fails on the first binding [`register`](Self::register) rejects.
    pub fn from_bindings(frame: FrameBuffer, bindings: &[RouteBinding], clamp: bool) -> Result<Self> {
        let mut router = Self::new(frame, clamp);
        for binding in bindings {
            router.register(&binding.address, binding.slot)?;
        }
        Ok(router)
    }

    /// Binds `address` to payload `slot`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoute` if the slot is outside `0..13`, the address does
    /// not start with `/`, or the address is already bound.
    pub fn register(&mut self, address: &str, slot: usize) -> Result<()> {
        if slot >= PAYLOAD_LEN {
            return Err(BridgeError::InvalidRoute(format!(
                "slot {} for {} is out of range (0-{})",
                slot,
                address,
                PAYLOAD_LEN - 1
            )));
        }

        if !address.starts_with('/') {
            return Err(BridgeError::InvalidRoute(format!(
                "address '{}' must start with '/'",
                address
            )));
        }

        if self.routes.contains_key(address) {
            return Err(BridgeError::InvalidRoute(format!(
                "address {} is bound more than once",
                address
            )));
        }

        self.routes.insert(
            address.to_string(),
            SlotRoute {
                slot,
                frame: self.frame.clone(),
                clamp: self.clamp,
            },
        );
        Ok(())
    }

    /// Routes a single message.
    pub fn dispatch(&self, msg: &OscMessage) -> Dispatch {
        let Some(route) = self.routes.get(&msg.addr) else {
            trace!("No route for {}", msg.addr);
            return Dispatch::Unrouted;
        };

        match msg.args.as_slice() {
            [arg] => match as_int(arg) {
                Some(value) => route.apply(value),
                None => {
                    warn!(
                        "Dropping malformed message for {}: expected a number, got {:?}",
                        msg.addr, arg
                    );
                    Dispatch::Malformed
                }
            },
            args => {
                warn!(
                    "Dropping malformed message for {}: expected one argument, got {}",
                    msg.addr,
                    args.len()
                );
                Dispatch::Malformed
            }
        }
    }

    /// Routes every message in a packet, descending into bundles.
    ///
    /// Returns the number of slots written.
    pub fn dispatch_packet(&self, packet: &OscPacket) -> usize {
        match packet {
            OscPacket::Message(msg) => match self.dispatch(msg) {
                Dispatch::Applied { .. } => 1,
                _ => 0,
            },
            OscPacket::Bundle(bundle) => bundle
                .content
                .iter()
                .map(|inner| self.dispatch_packet(inner))
                .sum(),
        }
    }

    /// Number of bound addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Slot bound to `address`, if any.
    #[must_use]
    pub fn slot_for(&self, address: &str) -> Option<usize> {
        self.routes.get(address).map(|route| route.slot)
    }
}
