//! Sandbox Terminal - interactive PTY tunnel over Socket.IO.
//!
//! This library connects a local terminal to a pseudo-terminal running
//! inside a remote sandbox, speaking the Socket.IO v4 wire protocol over a
//! single WebSocket.
//!
//! # Architecture
//!
//! The tunnel follows a client-server model:
//!
//! - **Local End (Rust)**: Forwards keystrokes, writes remote output
//! - **Remote End (Server)**: Runs the shell, emits `terminal:*` events
//!
//! Key design principles:
//!
//! - Each [`SocketIoTerminal`] owns one WebSocket connection
//! - Protocol uses `terminal:<action>` event names in the `/terminal` namespace
//! - Input is forwarded only after the server assigns a session
//! - The first terminal condition wins; later ones are discarded
//!
//! # Quick Start
//!
//! ```no_run
//! use sandbox_terminal::{Result, SocketIoTerminal};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // URL and token come from the sandbox REST API
//!     let terminal =
//!         SocketIoTerminal::connect("https://api.example.com/terminal", "tok-1", "sbx-abc123")
//!             .await?;
//!
//!     // Forward until the remote shell exits
//!     let result = terminal.run(tokio::io::stdin(), tokio::io::stdout()).await;
//!     terminal.close().await?;
//!     result
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | [`TunnelInfo`] returned by the REST API |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | URL builder, packet codec and event payloads (internal) |
//! | [`terminal`] | Connection session and forwarding |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// REST API boundary types.
pub mod api;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for tunnel entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Socket.IO wire protocol.
///
/// Internal module defining URL rewriting, packet framing and event payloads.
pub mod protocol;

/// Interactive terminals.
///
/// Use [`TerminalBuilder::new()`] or [`SocketIoTerminal::connect`].
pub mod terminal;

/// WebSocket transport layer.
///
/// Internal module wrapping one client WebSocket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// API types
pub use api::TunnelInfo;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SandboxId, SessionId};

// Protocol types
pub use protocol::{Endpoint, ServerEvent};

// Terminal types
pub use terminal::{
    ConnectionState, JsonTerminal, LocalInput, LocalOutput, PendingResize, Protocol,
    SocketIoTerminal, Terminal, TerminalBuilder, TerminalOptions,
};
