//! Socket.IO terminal protocol.
//!
//! This module defines the wire format spoken with the sandbox terminal
//! service: a fixed handshake URL, two-layer Engine.IO/Socket.IO framing,
//! and the `terminal:*` event vocabulary.
//!
//! # Protocol Overview
//!
//! | Step | Direction | Packet |
//! |------|-----------|--------|
//! | Open | server → client | `0{...}` |
//! | Namespace connect | client → server | `40/terminal,` |
//! | Start | client → server | `42/terminal,["terminal:start",{...}]` |
//! | Started | server → client | `42/terminal,["terminal:started",{...}]` |
//! | Heartbeat | server → client → server | `2` then `3` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `url` | Handshake URL and namespace derivation |
//! | `packet` | Packet classification, encoding, event parsing |
//! | `event` | Event names, payloads, [`ServerEvent`] |

// ============================================================================
// Submodules
// ============================================================================

/// Event vocabulary and payloads.
pub mod event;

/// Wire packet codec.
pub mod packet;

/// Handshake URL builder.
pub mod url;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{InputPayload, ResizePayload, ServerEvent, StartPayload};
pub use packet::{Packet, RawEvent, connect_packet, encode_event, namespace_prefix, parse_event};
pub use url::{DEFAULT_NAMESPACE, Endpoint, HANDSHAKE_PATH};
