//! Builder pattern for terminal configuration.
//!
//! Provides a fluent API for configuring and connecting terminals.
//!
//! # Example
//!
//! ```no_run
//! use sandbox_terminal::{PendingResize, Terminal, TerminalBuilder};
//!
//! # async fn example() -> sandbox_terminal::Result<()> {
//! let terminal = TerminalBuilder::new()
//!     .url("https://api.example.com/terminal")
//!     .token("tok-1")
//!     .sandbox_id("sbx-abc123")
//!     .pending_resize(PendingResize::Deferred)
//!     .connect()
//!     .await?;
//!
//! terminal.resize(80, 24).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::identifiers::SandboxId;

use super::Terminal;
use super::json::JsonTerminal;
use super::session::SocketIoTerminal;

// ============================================================================
// Constants
// ============================================================================

/// Local input read size per `terminal:input` event.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default limit for dial plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingResize
// ============================================================================

/// What to do with a resize requested before the session is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingResize {
    /// Ignore it; callers resend on the next size-change signal.
    #[default]
    Drop,
    /// Remember the latest size and send it as soon as the session starts.
    Deferred,
}

// ============================================================================
// Protocol
// ============================================================================

/// Wire protocol spoken by the terminal endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    /// Socket.IO over WebSocket with `terminal:*` events.
    #[default]
    SocketIo,
    /// Plain JSON messages over WebSocket with bearer authentication.
    Json,
}

// ============================================================================
// TerminalOptions
// ============================================================================

/// Tuning knobs shared by all terminals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    /// Maximum bytes read from local input per event.
    pub chunk_size: usize,

    /// Policy for resizes issued before the session starts.
    pub pending_resize: PendingResize,

    /// Limit for dial plus handshake. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pending_resize: PendingResize::Drop,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Sets the local input chunk size.
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the pre-session resize policy.
    #[inline]
    #[must_use]
    pub fn with_pending_resize(mut self, policy: PendingResize) -> Self {
        self.pending_resize = policy;
        self
    }

    /// Sets the connection setup limit.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = Some(limit);
        self
    }

    /// Removes the connection setup limit.
    #[inline]
    #[must_use]
    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Validates option values.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `chunk_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// TerminalBuilder
// ============================================================================

/// Builder for connecting a terminal.
///
/// URL and token normally come from [`TunnelInfo`](crate::TunnelInfo).
#[derive(Debug, Default, Clone)]
pub struct TerminalBuilder {
    /// Base connection URL.
    url: Option<String>,
    /// Short-lived access token.
    token: Option<String>,
    /// Sandbox to open the terminal on.
    sandbox_id: Option<SandboxId>,
    /// Wire protocol.
    protocol: Protocol,
    /// Tuning knobs.
    options: TerminalOptions,
}

// ============================================================================
// TerminalBuilder Implementation
// ============================================================================

impl TerminalBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base connection URL.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the access token.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the sandbox ID sent in `terminal:start`.
    #[inline]
    #[must_use]
    pub fn sandbox_id(mut self, sandbox_id: impl Into<SandboxId>) -> Self {
        self.sandbox_id = Some(sandbox_id.into());
        self
    }

    /// Selects the wire protocol.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TerminalOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the local input chunk size.
    #[inline]
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.options.chunk_size = chunk_size;
        self
    }

    /// Sets the pre-session resize policy.
    #[inline]
    #[must_use]
    pub fn pending_resize(mut self, policy: PendingResize) -> Self {
        self.options.pending_resize = policy;
        self
    }

    /// Sets the connection setup limit.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, limit: Duration) -> Self {
        self.options.connect_timeout = Some(limit);
        self
    }

    /// Connects a terminal speaking the configured protocol.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if url, token or (for Socket.IO) sandbox ID is missing
    /// - [`Error::InvalidUrl`] if the URL does not parse
    /// - [`Error::HandshakeFailed`] if dial or handshake fails
    pub async fn connect(self) -> Result<Box<dyn Terminal>> {
        match self.protocol {
            Protocol::SocketIo => Ok(Box::new(self.connect_socket_io().await?)),
            Protocol::Json => Ok(Box::new(self.connect_json().await?)),
        }
    }

    /// Connects a Socket.IO terminal regardless of the configured protocol.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_socket_io(self) -> Result<SocketIoTerminal> {
        let url = self.validate_url()?;
        let token = self.validate_token()?;
        let sandbox_id = self.validate_sandbox_id()?;

        SocketIoTerminal::connect_with(&url, &token, sandbox_id, self.options).await
    }

    /// Connects a JSON terminal regardless of the configured protocol.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_json(self) -> Result<JsonTerminal> {
        let url = self.validate_url()?;
        let token = self.validate_token()?;

        JsonTerminal::connect_with(&url, &token, self.options).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TerminalBuilder {
    /// Validates the URL configuration.
    fn validate_url(&self) -> Result<String> {
        self.url.clone().ok_or_else(|| {
            Error::config(
                "Terminal URL is required. Use .url() to set it.\n\
                 Example: TerminalBuilder::new().url(\"https://api.example.com/terminal\")",
            )
        })
    }

    /// Validates the token configuration.
    fn validate_token(&self) -> Result<String> {
        match &self.token {
            Some(token) if !token.is_empty() => Ok(token.clone()),
            _ => Err(Error::config(
                "Access token is required. Use .token() to set it.",
            )),
        }
    }

    /// Validates the sandbox ID configuration.
    fn validate_sandbox_id(&self) -> Result<SandboxId> {
        match &self.sandbox_id {
            Some(id) if !id.as_str().is_empty() => Ok(id.clone()),
            _ => Err(Error::config(
                "Sandbox ID is required. Use .sandbox_id() to set it.",
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
