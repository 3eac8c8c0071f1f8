//! # Event Translator Module
//!
//! Maps raw evdev events from the gamepad to outbound OSC parameter messages.
//!
//! ## Default Mapping
//!
//! Every mapped code is forwarded to `<base_path><SUFFIX>` with the raw event
//! value as a single `int32` argument. The suffix is the code's own name,
//! except for the two face buttons below:
//!
//! | evdev Code | Suffix |
//! |------------|--------|
//! | BTN_WEST | BTN_NORTH |
//! | BTN_NORTH | BTN_WEST |
//!
//! The RNBO patch was built against this labelling, so the swap is kept.
//!
//! ## Usage
//!
//! ```
//! use rnbo_bridge::controller::translator::{EventMap, EventKind, RawEvent};
//!
//! let map = EventMap::default();
//! let west = RawEvent::new(EventKind::Key, 0x134, 1);
//! assert_eq!(map.address_for(&west), Some("/rnbo/inst/0/params/gpin/BTN_NORTH"));
//! ```

use evdev::{AbsoluteAxisType, EventType, InputEvent, Key};
use rosc::OscType;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};
use crate::osc::MessageSink;

/// Default OSC base path for gamepad parameters.
pub const DEFAULT_BASE_PATH: &str = "/rnbo/inst/0/params/gpin/";

/// Default event code to suffix table.
pub const DEFAULT_EVENT_MAP: [(&str, &str); 18] = [
    ("ABS_X", "ABS_X"),
    ("ABS_Y", "ABS_Y"),
    ("ABS_Z", "ABS_Z"),
    ("ABS_RZ", "ABS_RZ"),
    ("ABS_BRAKE", "ABS_BRAKE"),
    ("ABS_GAS", "ABS_GAS"),
    ("ABS_HAT0X", "ABS_HAT0X"),
    ("ABS_HAT0Y", "ABS_HAT0Y"),
    ("BTN_TL", "BTN_TL"),
    ("BTN_TR", "BTN_TR"),
    ("BTN_SELECT", "BTN_SELECT"),
    ("BTN_START", "BTN_START"),
    ("BTN_EAST", "BTN_EAST"),
    ("BTN_SOUTH", "BTN_SOUTH"),
    ("BTN_THUMBL", "BTN_THUMBL"),
    ("BTN_THUMBR", "BTN_THUMBR"),
    // N and W are swapped on purpose
    ("BTN_WEST", "BTN_NORTH"),
    ("BTN_NORTH", "BTN_WEST"),
];

/// Class of an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// EV_ABS: sticks, triggers, d-pad
    Absolute,
    /// EV_KEY: buttons
    Key,
    /// Anything else (EV_SYN, EV_MSC, ...), never forwarded
    Other(u16),
}

/// Event kind plus code, the key of the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode {
    pub kind: EventKind,
    pub code: u16,
}

impl EventCode {
    fn absolute(axis: AbsoluteAxisType) -> Self {
        Self {
            kind: EventKind::Absolute,
            code: axis.0,
        }
    }

    fn key(key: Key) -> Self {
        Self {
            kind: EventKind::Key,
            code: key.code(),
        }
    }

    /// Looks up an evdev code by its kernel name (e.g. `"BTN_WEST"`).
    ///
    /// Only the axes and buttons a gamepad reports are known.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let code = match name {
            "ABS_X" => Self::absolute(AbsoluteAxisType::ABS_X),
            "ABS_Y" => Self::absolute(AbsoluteAxisType::ABS_Y),
            "ABS_Z" => Self::absolute(AbsoluteAxisType::ABS_Z),
            "ABS_RX" => Self::absolute(AbsoluteAxisType::ABS_RX),
            "ABS_RY" => Self::absolute(AbsoluteAxisType::ABS_RY),
            "ABS_RZ" => Self::absolute(AbsoluteAxisType::ABS_RZ),
            "ABS_GAS" => Self::absolute(AbsoluteAxisType::ABS_GAS),
            "ABS_BRAKE" => Self::absolute(AbsoluteAxisType::ABS_BRAKE),
            "ABS_HAT0X" => Self::absolute(AbsoluteAxisType::ABS_HAT0X),
            "ABS_HAT0Y" => Self::absolute(AbsoluteAxisType::ABS_HAT0Y),
            "BTN_SOUTH" => Self::key(Key::BTN_SOUTH),
            "BTN_EAST" => Self::key(Key::BTN_EAST),
            "BTN_NORTH" => Self::key(Key::BTN_NORTH),
            "BTN_WEST" => Self::key(Key::BTN_WEST),
            "BTN_TL" => Self::key(Key::BTN_TL),
            "BTN_TR" => Self::key(Key::BTN_TR),
            "BTN_TL2" => Self::key(Key::BTN_TL2),
            "BTN_TR2" => Self::key(Key::BTN_TR2),
            "BTN_SELECT" => Self::key(Key::BTN_SELECT),
            "BTN_START" => Self::key(Key::BTN_START),
            "BTN_MODE" => Self::key(Key::BTN_MODE),
            "BTN_THUMBL" => Self::key(Key::BTN_THUMBL),
            "BTN_THUMBR" => Self::key(Key::BTN_THUMBR),
            _ => return None,
        };
        Some(code)
    }
}

/// A single input event, decoupled from the evdev types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    #[must_use]
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    fn event_code(&self) -> EventCode {
        EventCode {
            kind: self.kind,
            code: self.code,
        }
    }
}

impl From<&InputEvent> for RawEvent {
    fn from(event: &InputEvent) -> Self {
        let kind = match event.event_type() {
            EventType::ABSOLUTE => EventKind::Absolute,
            EventType::KEY => EventKind::Key,
            other => EventKind::Other(other.0),
        };
        Self::new(kind, event.code(), event.value())
    }
}

/// One `code -> suffix` entry as it appears in configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub code: String,
    pub suffix: String,
}

/// The built-in bindings from [`DEFAULT_EVENT_MAP`].
#[must_use]
pub fn default_event_bindings() -> Vec<EventBinding> {
    DEFAULT_EVENT_MAP
        .iter()
        .map(|(code, suffix)| EventBinding {
            code: code.to_string(),
            suffix: suffix.to_string(),
        })
        .collect()
}

/// Immutable table from event code to full OSC address.
#[derive(Debug, Clone)]
pub struct EventMap {
    addresses: HashMap<EventCode, String>,
}

impl Default for EventMap {
    fn default() -> Self {
        let addresses = DEFAULT_EVENT_MAP
            .iter()
            .filter_map(|(name, suffix)| {
                EventCode::from_name(name)
                    .map(|code| (code, format!("{}{}", DEFAULT_BASE_PATH, suffix)))
            })
            .collect();
        Self { addresses }
    }
}

impl EventMap {
    /// Builds the table, prefixing every suffix with `base_path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoute` for an unknown code name, an empty suffix or a
    /// code bound twice.
    pub fn from_bindings(base_path: &str, bindings: &[EventBinding]) -> Result<Self> {
        let mut addresses = HashMap::with_capacity(bindings.len());

        for binding in bindings {
            let code = EventCode::from_name(&binding.code).ok_or_else(|| {
                BridgeError::InvalidRoute(format!("unknown event code '{}'", binding.code))
            })?;

            if binding.suffix.is_empty() {
                return Err(BridgeError::InvalidRoute(format!(
                    "empty suffix for event code '{}'",
                    binding.code
                )));
            }

            let address = format!("{}{}", base_path, binding.suffix);
            if addresses.insert(code, address).is_some() {
                return Err(BridgeError::InvalidRoute(format!(
                    "event code '{}' is bound more than once",
                    binding.code
                )));
            }
        }

        Ok(Self { addresses })
    }

    /// Returns the outbound address for an event, if it is forwarded at all.
    #[must_use]
    pub fn address_for(&self, event: &RawEvent) -> Option<&str> {
        match event.kind {
            EventKind::Absolute | EventKind::Key => {
                self.addresses.get(&event.event_code()).map(String::as_str)
            }
            EventKind::Other(_) => None,
        }
    }

    /// Number of mapped codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Forwards mapped events to a [`MessageSink`], one message per event.
pub struct EventTranslator<S> {
    map: EventMap,
    sink: S,
}

impl<S: MessageSink> EventTranslator<S> {
    pub fn new(map: EventMap, sink: S) -> Self {
        Self { map, sink }
    }

    /// Sends the event if its code is mapped.
    ///
    /// Returns `true` when a message was handed to the sink successfully.
    /// Send failures are logged and swallowed.
    pub async fn dispatch(&self, event: &RawEvent) -> bool {
        let Some(address) = self.map.address_for(event) else {
            trace!("Dropping unmapped event {:?}", event);
            return false;
        };

        match self
            .sink
            .send_message(address, vec![OscType::Int(event.value)])
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Failed to send {} = {}: {}", address, event.value, e);
                false
            }
        }
    }

    pub fn map(&self) -> &EventMap {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osc::MockMessageSink;

    fn key(name: &str) -> RawEvent {
        let code = EventCode::from_name(name).unwrap();
        RawEvent::new(code.kind, code.code, 1)
    }

    #[test]
    fn test_default_map_covers_all_entries() {
        let map = EventMap::default();
        assert_eq!(map.len(), 18);
        assert!(!map.is_empty());
    }

    #[test]
    fn test_north_west_are_swapped() {
        let map = EventMap::default();
        assert_eq!(
            map.address_for(&key("BTN_WEST")),
            Some("/rnbo/inst/0/params/gpin/BTN_NORTH")
        );
        assert_eq!(
            map.address_for(&key("BTN_NORTH")),
            Some("/rnbo/inst/0/params/gpin/BTN_WEST")
        );
    }

    #[test]
    fn test_other_codes_map_to_own_name() {
        let map = EventMap::default();
        for (name, suffix) in DEFAULT_EVENT_MAP {
            if name == "BTN_WEST" || name == "BTN_NORTH" {
                continue;
            }
            assert_eq!(name, suffix);
            let expected = format!("{}{}", DEFAULT_BASE_PATH, name);
            assert_eq!(map.address_for(&key(name)), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_kernel_code_values() {
        assert_eq!(EventCode::from_name("ABS_X").unwrap().code, 0x00);
        assert_eq!(EventCode::from_name("ABS_HAT0Y").unwrap().code, 0x11);
        assert_eq!(EventCode::from_name("BTN_SOUTH").unwrap().code, 0x130);
        assert_eq!(EventCode::from_name("BTN_NORTH").unwrap().code, 0x133);
        assert_eq!(EventCode::from_name("BTN_WEST").unwrap().code, 0x134);
        assert_eq!(EventCode::from_name("BTN_THUMBR").unwrap().code, 0x13e);
        assert_eq!(EventCode::from_name("BTN_FOO"), None);
    }

    #[test]
    fn test_unmapped_and_foreign_events_are_dropped() {
        let map = EventMap::default();
        // BTN_MODE is a known code but not in the default table
        assert_eq!(map.address_for(&key("BTN_MODE")), None);
        // ABS_RX shares no code with any mapped axis
        assert_eq!(map.address_for(&key("ABS_RX")), None);
        // EV_SYN carrying code 0 must not alias ABS_X
        assert_eq!(map.address_for(&RawEvent::new(EventKind::Other(0), 0, 0)), None);
        // Key code 0 must not alias ABS_X either
        assert_eq!(map.address_for(&RawEvent::new(EventKind::Key, 0, 1)), None);
    }

    #[test]
    fn test_custom_bindings() {
        let bindings = vec![EventBinding {
            code: "BTN_MODE".to_string(),
            suffix: "home".to_string(),
        }];
        let map = EventMap::from_bindings("/custom/", &bindings).unwrap();
        assert_eq!(map.address_for(&key("BTN_MODE")), Some("/custom/home"));
        assert_eq!(map.address_for(&key("BTN_WEST")), None);
    }

    #[test]
    fn test_invalid_bindings_are_rejected() {
        let unknown = vec![EventBinding {
            code: "BTN_NOPE".to_string(),
            suffix: "x".to_string(),
        }];
        assert!(matches!(
            EventMap::from_bindings(DEFAULT_BASE_PATH, &unknown),
            Err(BridgeError::InvalidRoute(_))
        ));

        let empty = vec![EventBinding {
            code: "BTN_TL".to_string(),
            suffix: String::new(),
        }];
        assert!(EventMap::from_bindings(DEFAULT_BASE_PATH, &empty).is_err());

        let mut twice = default_event_bindings();
        twice.push(EventBinding {
            code: "ABS_X".to_string(),
            suffix: "again".to_string(),
        });
        assert!(EventMap::from_bindings(DEFAULT_BASE_PATH, &twice).is_err());
    }

    #[tokio::test]
    async fn test_dispatch_sends_raw_value() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .withf(|addr, args| {
                addr == "/rnbo/inst/0/params/gpin/ABS_Y" && args == &vec![OscType::Int(-32768)]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let translator = EventTranslator::new(EventMap::default(), sink);
        let code = EventCode::from_name("ABS_Y").unwrap();
        assert!(translator.dispatch(&RawEvent::new(code.kind, code.code, -32768)).await);
    }

    #[tokio::test]
    async fn test_dispatch_west_goes_to_north() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .withf(|addr, args| {
                addr == "/rnbo/inst/0/params/gpin/BTN_NORTH" && args == &vec![OscType::Int(1)]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let translator = EventTranslator::new(EventMap::default(), sink);
        assert!(translator.dispatch(&key("BTN_WEST")).await);
    }

    #[tokio::test]
    async fn test_dispatch_unmapped_sends_nothing() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message().times(0);

        let translator = EventTranslator::new(EventMap::default(), sink);
        assert!(!translator.dispatch(&key("BTN_MODE")).await);
        assert!(
            !translator
                .dispatch(&RawEvent::new(EventKind::Other(0x04), 4, 589825))
                .await
        );
    }

    #[tokio::test]
    async fn test_dispatch_send_failure_is_swallowed() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .times(1)
            .returning(|_, _| Err(BridgeError::Osc("connection refused".to_string())));

        let translator = EventTranslator::new(EventMap::default(), sink);
        assert!(!translator.dispatch(&key("BTN_START")).await);
    }
}
