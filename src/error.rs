//! Error types for the sandbox terminal tunnel.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use sandbox_terminal::{Result, SocketIoTerminal};
//!
//! async fn example(url: &str, token: &str) -> Result<()> {
//!     let terminal = SocketIoTerminal::connect(url, token, "sbx-abc123").await?;
//!     let outcome = terminal.run(tokio::io::stdin(), tokio::io::stdout()).await;
//!     terminal.close().await?;
//!     outcome
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Setup | [`Error::HandshakeFailed`], [`Error::StartFailed`] |
//! | Protocol | [`Error::ProtocolViolation`], [`Error::Server`] |
//! | End of stream | [`Error::SessionEnded`], [`Error::InputClosed`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// End-of-stream variants describe a graceful shutdown and are turned into
/// `Ok(())` by the `run` operations. Everything else is fatal.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when builder configuration is incomplete or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Base connection URL could not be parsed.
    ///
    /// Surfaced before any socket activity.
    #[error("Invalid URL {url:?}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Dial failure, unexpected first packet, or namespace connect failure.
    #[error("Handshake failed: {message}")]
    HandshakeFailed {
        /// Description of the handshake failure.
        message: String,
    },

    /// The initial `terminal:start` event could not be sent.
    #[error("Failed to start terminal: {message}")]
    StartFailed {
        /// Description of the send failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed control frame (`terminal:started` or `terminal:error`).
    ///
    /// Indicates client/server incompatibility rather than a transient issue.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    /// Session error declared by the server.
    #[error("terminal error: {message}")]
    Server {
        /// Message passed through verbatim from the server.
        message: String,
    },

    // ========================================================================
    // End of Stream
    // ========================================================================
    /// The server ended the terminal session.
    #[error("Terminal session ended")]
    SessionEnded,

    /// Local input reached end of stream.
    #[error("Local input closed")]
    InputClosed,

    /// The connection is closed, locally or by the peer.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a handshake failed error.
    #[inline]
    pub fn handshake_failed(message: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            message: message.into(),
        }
    }

    /// Creates a start failed error.
    #[inline]
    pub fn start_failed(message: impl Into<String>) -> Self {
        Self::StartFailed {
            message: message.into(),
        }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a server-declared session error.
    #[inline]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error marks a graceful end of stream.
    #[inline]
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            Self::SessionEnded | Self::InputClosed | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this error happened while setting up the tunnel.
    #[inline]
    #[must_use]
    pub fn is_handshake_error(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. } | Self::HandshakeFailed { .. })
    }

    /// Returns `true` if the invoking command should report this error.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_end_of_stream()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::handshake_failed("unexpected open packet");
        assert_eq!(err.to_string(), "Handshake failed: unexpected open packet");
    }

    #[test]
    fn test_server_error_carries_message() {
        let err = Error::server("sandbox is not running");
        assert_eq!(err.to_string(), "terminal error: sandbox is not running");
    }

    #[test]
    fn test_is_end_of_stream() {
        assert!(Error::SessionEnded.is_end_of_stream());
        assert!(Error::InputClosed.is_end_of_stream());
        assert!(Error::ConnectionClosed.is_end_of_stream());
        assert!(!Error::server("boom").is_end_of_stream());
        assert!(!Error::protocol_violation("bad").is_end_of_stream());
    }

    #[test]
    fn test_is_handshake_error() {
        assert!(Error::invalid_url("::", "relative URL without a base").is_handshake_error());
        assert!(Error::handshake_failed("dial").is_handshake_error());
        assert!(!Error::start_failed("send").is_handshake_error());
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::start_failed("send").is_fatal());
        assert!(!Error::SessionEnded.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
