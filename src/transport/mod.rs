//! WebSocket transport layer.
//!
//! This module owns the physical connection to the sandbox terminal
//! service. Framing above text frames is left to [`crate::protocol`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Terminal       │                              │  Terminal       │
//! │  (Rust client)  │         WebSocket            │  service        │
//! │                 │◄────────────────────────────►│                 │
//! │  Socket         │    ws:// or wss://           │  Socket.IO      │
//! │                 │                              │  server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Socket::dial` - Connect and upgrade
//! 2. `Socket::send_text` / `Socket::recv_text` - Exchange frames
//! 3. `Socket::close` - Close once, wake pending reads

// ============================================================================
// Submodules
// ============================================================================

/// Owned WebSocket connection.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::{Socket, WsStream};
