//! Terminal event vocabulary.
//!
//! Client events are plain serializable payload structs. Server events are
//! decoded into the closed [`ServerEvent`] union so the I/O pump matches
//! exhaustively instead of comparing strings.
//!
//! # Event Types
//!
//! | Event | Direction | Payload |
//! |-------|-----------|---------|
//! | `terminal:start` | client → server | `{ sandboxId }` |
//! | `terminal:started` | server → client | `{ sessionId }` |
//! | `terminal:input` | client → server | `{ sessionId, data: base64 }` |
//! | `terminal:output` | server → client | `{ sessionId, data: base64 }` |
//! | `terminal:resize` | client → server | `{ sessionId, cols, rows }` |
//! | `terminal:error` | server → client | `{ message }` |
//! | `terminal:ended` | server → client | `{ sessionId }` |

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::identifiers::{SandboxId, SessionId};

use super::packet::RawEvent;

// ============================================================================
// Event Names
// ============================================================================

/// `terminal:start`
pub const START: &str = "terminal:start";
/// `terminal:started`
pub const STARTED: &str = "terminal:started";
/// `terminal:input`
pub const INPUT: &str = "terminal:input";
/// `terminal:output`
pub const OUTPUT: &str = "terminal:output";
/// `terminal:resize`
pub const RESIZE: &str = "terminal:resize";
/// `terminal:error`
pub const ERROR: &str = "terminal:error";
/// `terminal:ended`
pub const ENDED: &str = "terminal:ended";

// ============================================================================
// Client Payloads
// ============================================================================

/// Payload of `terminal:start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload<'a> {
    /// Sandbox to open the terminal on.
    pub sandbox_id: &'a SandboxId,
}

/// Payload of `terminal:input`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPayload<'a> {
    /// Active session.
    pub session_id: &'a SessionId,
    /// Base64-encoded input bytes.
    pub data: String,
}

impl<'a> InputPayload<'a> {
    /// Encodes a chunk of local input.
    #[inline]
    #[must_use]
    pub fn new(session_id: &'a SessionId, bytes: &[u8]) -> Self {
        Self {
            session_id,
            data: STANDARD.encode(bytes),
        }
    }
}

/// Payload of `terminal:resize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePayload<'a> {
    /// Active session.
    pub session_id: &'a SessionId,
    /// Terminal width in columns.
    pub cols: u16,
    /// Terminal height in rows.
    pub rows: u16,
}

// ============================================================================
// Server Payloads
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartedPayload {
    #[serde(default)]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct OutputPayload {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

// ============================================================================
// ServerEvent
// ============================================================================

/// Decoded server-to-client event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Session is active.
    Started {
        /// Server-assigned session ID.
        session_id: SessionId,
    },

    /// Terminal output, already base64-decoded.
    Output {
        /// Bytes for the local output sink.
        data: Vec<u8>,
    },

    /// `terminal:output` whose envelope could not be decoded.
    ///
    /// Tolerated: output loss is preferred over ending the connection.
    MalformedOutput,

    /// Server-declared session error.
    Error {
        /// Non-empty server message.
        message: String,
    },

    /// Session ended.
    Ended,

    /// Event outside the terminal vocabulary.
    Unknown {
        /// Event name.
        name: String,
    },
}

impl ServerEvent {
    /// Interprets a raw event by name.
    ///
    /// `terminal:output` is decoded tolerantly: a payload that is not valid
    /// base64 is passed through as raw text, and an undecodable envelope
    /// yields [`ServerEvent::MalformedOutput`]. Control frames are strict.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] for a `terminal:started` without a
    /// session ID or a `terminal:error` without a message.
    pub fn decode(raw: RawEvent) -> Result<Self> {
        let payload = raw.payload.as_deref();

        match raw.name.as_str() {
            STARTED => {
                let session_id = payload_as::<StartedPayload>(payload)
                    .and_then(|p| SessionId::new(p.session_id))
                    .ok_or_else(|| {
                        Error::protocol_violation("failed to decode terminal:started payload")
                    })?;
                Ok(Self::Started { session_id })
            }

            OUTPUT => Ok(match payload_as::<OutputPayload>(payload) {
                Some(p) => Self::Output {
                    data: STANDARD
                        .decode(&p.data)
                        .unwrap_or_else(|_| p.data.into_bytes()),
                },
                None => Self::MalformedOutput,
            }),

            ERROR => {
                let message = payload_as::<ErrorPayload>(payload)
                    .map(|p| p.message)
                    .filter(|m| !m.trim().is_empty())
                    .ok_or_else(|| {
                        Error::protocol_violation("failed to decode terminal:error payload")
                    })?;
                Ok(Self::Error { message })
            }

            ENDED => Ok(Self::Ended),

            name => Ok(Self::Unknown {
                name: name.to_string(),
            }),
        }
    }
}

/// Deserializes an optional raw payload, `None` on absence or mismatch.
fn payload_as<T: DeserializeOwned>(payload: Option<&RawValue>) -> Option<T> {
    serde_json::from_str(payload?.get()).ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::packet::parse_event;

    fn decode(packet: &str) -> Result<ServerEvent> {
        ServerEvent::decode(parse_event(packet).expect("event frame"))
    }

    #[test]
    fn test_started() {
        let event = decode(r#"2/terminal,["terminal:started",{"sessionId":"s1"}]"#)
            .expect("decode");
        assert_eq!(
            event,
            ServerEvent::Started {
                session_id: SessionId::new("s1").expect("non-empty")
            }
        );
    }

    #[test]
    fn test_started_without_session_is_violation() {
        for packet in [
            r#"2["terminal:started",{}]"#,
            r#"2["terminal:started",{"sessionId":""}]"#,
            r#"2["terminal:started","s1"]"#,
            r#"2["terminal:started"]"#,
        ] {
            let err = decode(packet).unwrap_err();
            assert!(matches!(err, Error::ProtocolViolation { .. }), "{packet}");
        }
    }

    #[test]
    fn test_output_base64() {
        let event = decode(r#"2["terminal:output",{"sessionId":"s1","data":"aGVsbG8="}]"#)
            .expect("decode");
        assert_eq!(event, ServerEvent::Output { data: b"hello".to_vec() });
    }

    #[test]
    fn test_output_falls_back_to_raw_text() {
        let event = decode(r#"2["terminal:output",{"data":"plain!"}]"#).expect("decode");
        assert_eq!(event, ServerEvent::Output { data: b"plain!".to_vec() });
    }

    #[test]
    fn test_malformed_output_is_tolerated() {
        let event = decode(r#"2["terminal:output","oops"]"#).expect("decode");
        assert_eq!(event, ServerEvent::MalformedOutput);
    }

    #[test]
    fn test_error_with_message() {
        let event = decode(r#"2["terminal:error",{"message":"sandbox stopped"}]"#)
            .expect("decode");
        assert_eq!(
            event,
            ServerEvent::Error {
                message: "sandbox stopped".into()
            }
        );
    }

    #[test]
    fn test_error_without_message_is_violation() {
        for packet in [
            r#"2["terminal:error",{"message":"  "}]"#,
            r#"2["terminal:error",{}]"#,
            r#"2["terminal:error",42]"#,
        ] {
            let err = decode(packet).unwrap_err();
            assert!(matches!(err, Error::ProtocolViolation { .. }), "{packet}");
        }
    }

    #[test]
    fn test_ended_ignores_payload() {
        assert_eq!(decode(r#"2["terminal:ended"]"#).expect("decode"), ServerEvent::Ended);
        assert_eq!(
            decode(r#"2["terminal:ended",{"sessionId":"s1"}]"#).expect("decode"),
            ServerEvent::Ended
        );
    }

    #[test]
    fn test_unknown_event() {
        let event = decode(r#"2["terminal:motd",{"text":"hi"}]"#).expect("decode");
        assert_eq!(
            event,
            ServerEvent::Unknown {
                name: "terminal:motd".into()
            }
        );
    }

    #[test]
    fn test_resize_payload_field_order() {
        let session_id = SessionId::new("s1").expect("non-empty");
        let json = serde_json::to_string(&ResizePayload {
            session_id: &session_id,
            cols: 80,
            rows: 24,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"sessionId":"s1","cols":80,"rows":24}"#);
    }

    #[test]
    fn test_input_payload_encodes_base64() {
        let session_id = SessionId::new("s1").expect("non-empty");
        let json = serde_json::to_string(&InputPayload::new(&session_id, b"ls\n"))
            .expect("serialize");
        assert_eq!(json, r#"{"sessionId":"s1","data":"bHMK"}"#);
    }
}
