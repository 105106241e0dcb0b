//! Interactive terminal tunnels.
//!
//! A terminal owns one connection, forwards local input to the remote
//! pseudo-terminal and remote output to a local sink until either side
//! ends the session.
//!
//! # Lifecycle
//!
//! 1. Connect - dial and handshake ([`SocketIoTerminal::connect`])
//! 2. Resize - send the initial size, then again on every size change
//! 3. Run - full-duplex forwarding until end, error, or input exhaustion
//! 4. Close - release the connection on every exit path
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`TerminalBuilder`] and [`TerminalOptions`] |
//! | `session` | [`SocketIoTerminal`] connection session |
//! | `pump` | Full-duplex forwarding loops |
//! | `json` | [`JsonTerminal`] for plain JSON WebSocket endpoints |

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// Builder and options.
pub mod builder;

/// JSON WebSocket terminal.
pub mod json;

/// Forwarding loops.
mod pump;

/// Socket.IO connection session.
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{PendingResize, Protocol, TerminalBuilder, TerminalOptions};
pub use json::JsonTerminal;
pub use session::{ConnectionState, SocketIoTerminal};

// ============================================================================
// Types
// ============================================================================

/// Boxed local byte source, normally standard input in raw mode.
pub type LocalInput = Box<dyn AsyncRead + Unpin + Send>;

/// Boxed local byte sink, normally standard output.
pub type LocalOutput = Box<dyn AsyncWrite + Unpin + Send>;

// ============================================================================
// Terminal
// ============================================================================

/// Operations shared by every terminal transport.
///
/// Lets the invoking command hold a `Box<dyn Terminal>` regardless of the
/// wire protocol chosen by [`TerminalBuilder::protocol`].
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Reports a new local terminal size.
    async fn resize(&self, cols: u16, rows: u16) -> Result<()>;

    /// Forwards input and output until the session ends.
    ///
    /// Returns `Ok(())` for a graceful end of stream.
    async fn run(&self, input: LocalInput, output: LocalOutput) -> Result<()>;

    /// Releases the connection. Idempotent.
    async fn close(&self) -> Result<()>;
}

// ============================================================================
// Helpers
// ============================================================================

/// Bounds connection setup by an optional limit.
///
/// Expiry is reported as [`Error::HandshakeFailed`].
pub(crate) async fn within<T>(
    limit: Option<Duration>,
    setup: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => timeout(limit, setup).await.map_err(|_| {
            Error::handshake_failed(format!("timed out after {}ms", limit.as_millis()))
        })?,
        None => setup.await,
    }
}
