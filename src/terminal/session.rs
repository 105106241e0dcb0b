//! Socket.IO terminal connection session.
//!
//! Owns the socket, runs the handshake, tracks the server-assigned session
//! ID and exposes `resize`, `run` and `close`.
//!
//! # Handshake
//!
//! ```text
//! Connecting ──► HandshakeWait ──► NamespaceConnecting ──► NamespaceConnected
//!      │               │                    │                      │
//!      └───────────────┴────────────────────┴──────────────────────┴──► Closed
//! ```
//!
//! 1. `Connecting` - open the WebSocket to the derived handshake URL
//! 2. `HandshakeWait` - the first frame must be an Engine.IO open packet
//! 3. `NamespaceConnecting` - send `40<namespace>,`
//! 4. `NamespaceConnected` - ready to run

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::identifiers::{SandboxId, SessionId};
use crate::protocol::event::{RESIZE, ResizePayload};
use crate::protocol::{Endpoint, Packet, connect_packet, encode_event};
use crate::transport::Socket;

use super::builder::{PendingResize, TerminalOptions};
use super::{LocalInput, LocalOutput, Terminal, within};

// ============================================================================
// ConnectionState
// ============================================================================

/// Handshake progress of a [`SocketIoTerminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the WebSocket.
    Connecting,
    /// Waiting for the Engine.IO open packet.
    HandshakeWait,
    /// Sending the namespace connect packet.
    NamespaceConnecting,
    /// Handshake complete.
    NamespaceConnected,
    /// Closed. Terminal state.
    Closed,
}

// ============================================================================
// Session Assignment
// ============================================================================

/// Result of recording a `terminal:started` acknowledgment.
pub(crate) enum Assignment {
    /// First acknowledgment; carries a deferred resize, if any.
    First {
        /// Size requested before the session started.
        pending: Option<(u16, u16)>,
    },
    /// A session was already assigned and is kept.
    Repeated {
        /// The session ID in effect.
        current: SessionId,
    },
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the handle and the forwarding tasks.
pub(crate) struct Shared {
    /// Exclusively owned connection.
    pub(crate) socket: Socket,
    /// Namespace joined during the handshake.
    pub(crate) namespace: String,
    /// Sandbox named in `terminal:start`.
    pub(crate) sandbox_id: SandboxId,
    /// Tuning knobs.
    pub(crate) options: TerminalOptions,
    /// Empty until `terminal:started`, then fixed.
    session: RwLock<Option<SessionId>>,
    /// Latest pre-session size under [`PendingResize::Deferred`].
    pending_resize: Mutex<Option<(u16, u16)>>,
    /// Handshake progress.
    state: RwLock<ConnectionState>,
}

impl Shared {
    /// Encodes and sends one event.
    pub(crate) async fn emit<T: Serialize>(&self, name: &str, payload: &T) -> Result<()> {
        let packet = encode_event(&self.namespace, name, payload)?;
        self.socket.send_text(packet).await
    }

    /// Sends a `terminal:resize` event.
    pub(crate) async fn send_resize(
        &self,
        session_id: &SessionId,
        cols: u16,
        rows: u16,
    ) -> Result<()> {
        debug!(%session_id, cols, rows, "Sending resize");
        self.emit(
            RESIZE,
            &ResizePayload {
                session_id,
                cols,
                rows,
            },
        )
        .await
    }

    /// Returns the session ID, if assigned.
    pub(crate) fn session_id(&self) -> Option<SessionId> {
        self.session.read().clone()
    }

    /// Records the session ID once; later acknowledgments are ignored.
    pub(crate) fn assign_session(&self, session_id: SessionId) -> Assignment {
        let mut session = self.session.write();
        if let Some(current) = session.as_ref() {
            return Assignment::Repeated {
                current: current.clone(),
            };
        }

        *session = Some(session_id);
        Assignment::First {
            pending: self.pending_resize.lock().take(),
        }
    }

    /// Advances the handshake state unless already closed.
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write();
        if *state != ConnectionState::Closed {
            trace!(from = ?*state, to = ?next, "Connection state");
            *state = next;
        }
    }
}

// ============================================================================
// SocketIoTerminal
// ============================================================================

/// Terminal tunnel over a Socket.IO connection.
///
/// Cloning yields another handle to the same session, so a size-change
/// listener can call [`resize`](Self::resize) while [`run`](Self::run) is
/// in progress.
///
/// # Example
///
/// ```no_run
/// use sandbox_terminal::SocketIoTerminal;
///
/// # async fn example() -> sandbox_terminal::Result<()> {
/// let terminal =
///     SocketIoTerminal::connect("https://api.example.com/terminal", "tok-1", "sbx-abc123").await?;
///
/// terminal.resize(80, 24).await?;
/// let outcome = terminal.run(tokio::io::stdin(), tokio::io::stdout()).await;
/// terminal.close().await?;
/// outcome
/// # }
/// ```
#[derive(Clone)]
pub struct SocketIoTerminal {
    pub(crate) shared: Arc<Shared>,
}

impl SocketIoTerminal {
    /// Connects with default options.
    ///
    /// # Errors
    ///
    /// See [`connect_with`](Self::connect_with).
    pub async fn connect(
        url: &str,
        token: &str,
        sandbox_id: impl Into<SandboxId>,
    ) -> Result<Self> {
        Self::connect_with(url, token, sandbox_id, TerminalOptions::default()).await
    }

    /// Dials the derived handshake URL and completes the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::InvalidUrl`] if `url` does not parse
    /// - [`Error::HandshakeFailed`] on dial failure, unexpected first packet,
    ///   namespace connect failure, or setup timeout
    pub async fn connect_with(
        url: &str,
        token: &str,
        sandbox_id: impl Into<SandboxId>,
        options: TerminalOptions,
    ) -> Result<Self> {
        options.validate()?;
        let endpoint = Endpoint::from_base_url(url, token)?;
        let sandbox_id = sandbox_id.into();

        debug!(
            namespace = %endpoint.namespace,
            %sandbox_id,
            "Connecting terminal"
        );

        within(
            options.connect_timeout,
            Self::dial(endpoint, sandbox_id, options),
        )
        .await
    }

    /// Dials and handshakes, closing the socket if the handshake fails.
    async fn dial(
        endpoint: Endpoint,
        sandbox_id: SandboxId,
        options: TerminalOptions,
    ) -> Result<Self> {
        let request = endpoint
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::handshake_failed(format!("failed to connect: {e}")))?;

        let socket = Socket::dial(request)
            .await
            .map_err(|e| Error::handshake_failed(format!("failed to connect: {e}")))?;

        let terminal = Self::from_socket(socket, endpoint.namespace, sandbox_id, options);
        if let Err(e) = terminal.handshake().await {
            let _ = terminal.close().await;
            return Err(e);
        }

        Ok(terminal)
    }

    /// Wraps a freshly dialed socket.
    fn from_socket(
        socket: Socket,
        namespace: String,
        sandbox_id: SandboxId,
        options: TerminalOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                socket,
                namespace,
                sandbox_id,
                options,
                session: RwLock::new(None),
                pending_resize: Mutex::new(None),
                state: RwLock::new(ConnectionState::Connecting),
            }),
        }
    }

    /// Runs the Engine.IO open / Socket.IO namespace connect exchange.
    async fn handshake(&self) -> Result<()> {
        let shared = &self.shared;

        shared.set_state(ConnectionState::HandshakeWait);
        let packet = shared
            .socket
            .recv_text()
            .await
            .map_err(|e| Error::handshake_failed(format!("no open packet: {e}")))?;

        if !matches!(Packet::classify(&packet), Some(Packet::Open(_))) {
            return Err(Error::handshake_failed("unexpected open packet"));
        }

        shared.set_state(ConnectionState::NamespaceConnecting);
        shared
            .socket
            .send_text(connect_packet(&shared.namespace))
            .await
            .map_err(|e| Error::handshake_failed(format!("namespace connect failed: {e}")))?;

        shared.set_state(ConnectionState::NamespaceConnected);
        info!(namespace = %shared.namespace, "Terminal connected");

        Ok(())
    }

    /// Sends the local terminal size.
    ///
    /// Before the session starts this sends nothing and succeeds; under
    /// [`PendingResize::Deferred`] the size is remembered and sent right
    /// after `terminal:started`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the terminal is closed
    /// - [`Error::WebSocket`] on transport failure
    pub async fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let shared = &self.shared;
        if shared.socket.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let session_id = {
            let session = shared.session.read();
            match session.as_ref() {
                Some(id) => id.clone(),
                None => {
                    if shared.options.pending_resize == PendingResize::Deferred {
                        *shared.pending_resize.lock() = Some((cols, rows));
                        trace!(cols, rows, "Deferring resize until session start");
                    } else {
                        trace!(cols, rows, "Ignoring resize before session start");
                    }
                    return Ok(());
                }
            }
        };

        shared.send_resize(&session_id, cols, rows).await
    }

    /// Closes the connection.
    ///
    /// Idempotent: later calls are no-ops returning `Ok(())`. Forwarding
    /// tasks still running observe [`Error::ConnectionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.shared.socket.close().await?;
        *self.shared.state.write() = ConnectionState::Closed;
        Ok(())
    }

    /// Returns the server-assigned session ID, once started.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.session_id()
    }

    /// Returns the namespace joined during the handshake.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    /// Returns the sandbox this terminal targets.
    #[inline]
    #[must_use]
    pub fn sandbox_id(&self) -> &SandboxId {
        &self.shared.sandbox_id
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }
}

#[async_trait]
impl Terminal for SocketIoTerminal {
    async fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        SocketIoTerminal::resize(self, cols, rows).await
    }

    async fn run(&self, input: LocalInput, output: LocalOutput) -> Result<()> {
        SocketIoTerminal::run(self, input, output).await
    }

    async fn close(&self) -> Result<()> {
        SocketIoTerminal::close(self).await
    }
}

// ============================================================================
// Tests
// ============================================================================
