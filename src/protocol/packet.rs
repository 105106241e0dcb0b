//! Two-layer wire packet codec.
//!
//! Every WebSocket text frame is an Engine.IO packet whose first character
//! selects its type. Message packets (`4`) carry a Socket.IO packet, which
//! again starts with a type character, then an optional namespace prefix
//! and a JSON array body.
//!
//! | Layer | Marker | Meaning |
//! |-------|--------|---------|
//! | Engine.IO | `0` | open (handshake only) |
//! | Engine.IO | `2` | heartbeat ping |
//! | Engine.IO | `3` | heartbeat pong |
//! | Engine.IO | `4` | message |
//! | Socket.IO | `0` | connect to namespace |
//! | Socket.IO | `2` | event |
//!
//! ```text
//! 42/terminal,["terminal:resize",{"sessionId":"s1","cols":80,"rows":24}]
//! ││└── ns ──┘└──────────────── event array ──────────────────────────┘
//! │└ event
//! └ message
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::value::RawValue;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Engine.IO open packet marker.
pub const OPEN: char = '0';

/// Engine.IO ping marker.
pub const PING: char = '2';

/// Engine.IO pong marker.
pub const PONG_MARKER: char = '3';

/// Engine.IO pong packet (no payload).
pub const PONG: &str = "3";

/// Engine.IO message marker.
pub const MESSAGE: char = '4';

/// Socket.IO connect marker.
const CONNECT: char = '0';

/// Socket.IO event marker.
const EVENT: char = '2';

/// Separator between a namespace and the packet body.
const NAMESPACE_SEPARATOR: char = ',';

// ============================================================================
// Packet
// ============================================================================

/// Engine.IO-level classification of an inbound text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// Open packet with its handshake payload.
    Open(&'a str),
    /// Heartbeat ping; must be answered with [`PONG`].
    Ping,
    /// Heartbeat pong.
    Pong,
    /// Message envelope holding a Socket.IO packet.
    Message(&'a str),
    /// Any other Engine.IO packet type (close, upgrade, noop).
    Other(char),
}

impl<'a> Packet<'a> {
    /// Classifies a frame by its first character.
    ///
    /// Returns `None` for an empty frame.
    #[must_use]
    pub fn classify(text: &'a str) -> Option<Self> {
        let mut chars = text.chars();
        let marker = chars.next()?;
        let rest = chars.as_str();

        Some(match marker {
            OPEN => Self::Open(rest),
            PING => Self::Ping,
            PONG_MARKER => Self::Pong,
            MESSAGE => Self::Message(rest),
            other => Self::Other(other),
        })
    }
}

// ============================================================================
// RawEvent
// ============================================================================

/// A decoded event frame with its payload left undecoded.
///
/// The payload is interpreted per event name by
/// [`ServerEvent::decode`](super::ServerEvent::decode).
#[derive(Debug)]
pub struct RawEvent {
    /// Event name, never empty.
    pub name: String,
    /// Second array element, if present.
    pub payload: Option<Box<RawValue>>,
}

// ============================================================================
// Encoding
// ============================================================================

/// Returns the `<namespace>,` prefix, or nothing for the root namespace.
#[must_use]
pub fn namespace_prefix(namespace: &str) -> String {
    if namespace.is_empty() || namespace == "/" {
        String::new()
    } else {
        format!("{namespace}{NAMESPACE_SEPARATOR}")
    }
}

/// Builds the namespace connect packet (`40` plus prefix).
#[must_use]
pub fn connect_packet(namespace: &str) -> String {
    format!("{MESSAGE}{CONNECT}{}", namespace_prefix(namespace))
}

/// Encodes an event frame as `42<prefix>[name, payload]`.
///
/// # Errors
///
/// [`Error::Json`](crate::Error::Json) if the payload fails to serialize.
pub fn encode_event<T: Serialize>(namespace: &str, name: &str, payload: &T) -> Result<String> {
    let body = serde_json::to_string(&(name, payload))?;
    Ok(format!(
        "{MESSAGE}{EVENT}{}{body}",
        namespace_prefix(namespace)
    ))
}

// ============================================================================
// Decoding
// ============================================================================

/// Parses a Socket.IO packet (the part after the Engine.IO `4`) as an event.
///
/// Returns `None` when the packet is not an event frame: wrong type, missing
/// array body, empty array, or a non-string or empty event name. Root and
/// namespaced forms decode identically.
#[must_use]
pub fn parse_event(packet: &str) -> Option<RawEvent> {
    let body = packet.strip_prefix(EVENT)?;

    let body = if body.starts_with('/') {
        let (_, rest) = body.split_once(NAMESPACE_SEPARATOR)?;
        rest
    } else {
        body
    };

    if !body.starts_with('[') {
        return None;
    }

    let elements: Vec<Box<RawValue>> = serde_json::from_str(body).ok()?;
    let mut elements = elements.into_iter();

    let name: String = serde_json::from_str(elements.next()?.get()).ok()?;
    if name.is_empty() {
        return None;
    }

    Some(RawEvent {
        name,
        payload: elements.next(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::{Value, json};

    #[test]
    fn test_classify() {
        assert_eq!(Packet::classify(""), None);
        assert_eq!(
            Packet::classify("0{\"sid\":\"x\"}"),
            Some(Packet::Open("{\"sid\":\"x\"}"))
        );
        assert_eq!(Packet::classify("2"), Some(Packet::Ping));
        assert_eq!(Packet::classify("3"), Some(Packet::Pong));
        assert_eq!(Packet::classify("42[]"), Some(Packet::Message("2[]")));
        assert_eq!(Packet::classify("6"), Some(Packet::Other('6')));
    }

    #[test]
    fn test_pong_is_classified_as_pong() {
        assert!(PONG.starts_with(PONG_MARKER));
        assert_eq!(PONG.len(), PONG_MARKER.len_utf8());
        assert_eq!(Packet::classify(PONG), Some(Packet::Pong));
    }

    #[test]
    fn test_connect_packet() {
        assert_eq!(connect_packet("/terminal"), "40/terminal,");
        assert_eq!(connect_packet("/"), "40");
        assert_eq!(connect_packet(""), "40");
    }

    #[test]
    fn test_encode_resize_scenario() {
        let packet = encode_event(
            "/terminal",
            "terminal:resize",
            &json!({ "sessionId": "s1", "cols": 80, "rows": 24 }),
        )
        .expect("encode");

        assert_eq!(
            packet,
            r#"42/terminal,["terminal:resize",{"cols":80,"rows":24,"sessionId":"s1"}]"#
        );
    }

    #[test]
    fn test_encode_root_namespace() {
        let packet = encode_event("/", "ping", &json!({})).expect("encode");
        assert_eq!(packet, r#"42["ping",{}]"#);
    }

    #[test]
    fn test_parse_started_scenario() {
        let event = parse_event(r#"2/terminal,["terminal:started",{"sessionId":"s1"}]"#)
            .expect("event frame");

        assert_eq!(event.name, "terminal:started");
        assert_eq!(
            event.payload.as_deref().map(RawValue::get),
            Some(r#"{"sessionId":"s1"}"#)
        );
    }

    #[test]
    fn test_open_packet_is_not_an_event() {
        assert!(parse_event(r#"0/terminal,{"sid":"x"}"#).is_none());
        assert!(matches!(
            Packet::classify(r#"0/terminal,{"sid":"x"}"#),
            Some(Packet::Open(_))
        ));
    }

    #[test]
    fn test_event_without_payload() {
        let event = parse_event(r#"2["terminal:ended"]"#).expect("event frame");
        assert_eq!(event.name, "terminal:ended");
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_not_events() {
        assert!(parse_event("").is_none());
        assert!(parse_event("2").is_none());
        assert!(parse_event("2{}").is_none());
        assert!(parse_event("2[]").is_none());
        assert!(parse_event(r#"2[""]"#).is_none());
        assert!(parse_event("2[42]").is_none());
        assert!(parse_event(r#"2/terminal["x"]"#).is_none());
        assert!(parse_event(r#"2/terminal,{"a":1}"#).is_none());
        assert!(parse_event(r#"2["x""#).is_none());
        assert!(parse_event(r#"3["terminal:output",{}]"#).is_none());
    }

    proptest! {
        #[test]
        fn prop_parse_is_left_inverse_of_encode(
            root in any::<bool>(),
            name in "[a-z][a-z:]{0,15}",
            fields in proptest::collection::btree_map("[a-zA-Z]{1,8}", "[ -~]{0,12}", 0..4),
        ) {
            let namespace = if root { "/" } else { "/terminal" };
            let payload: Value = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<serde_json::Map<_, _>>()
                .into();

            let packet = encode_event(namespace, &name, &payload).expect("encode");
            let inner = packet.strip_prefix(MESSAGE).expect("message marker");
            let event = parse_event(inner).expect("event frame");

            prop_assert_eq!(event.name, name);
            let decoded: Value =
                serde_json::from_str(event.payload.expect("payload").get()).expect("json");
            prop_assert_eq!(decoded, payload);
        }
    }
}
