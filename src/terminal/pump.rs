//! Full-duplex forwarding.
//!
//! `run` drives two tasks per active session:
//!
//! ```text
//!             ┌──────────── inbound ────────────┐
//!  socket ───►│ ping → pong                     │
//!             │ started → record id, signal ────┼──► active
//!             │ output → local sink             │
//!             │ error / ended / read failure ───┼──┐
//!             └─────────────────────────────────┘  │
//!             ┌──────────── outbound ───────────┐  ▼
//!  input ────►│ chunk → base64 → terminal:input │─► Completion (first wins) ──► run
//!             └─────────────────────────────────┘
//! ```
//!
//! The outbound task starts only after the session is active, so no input
//! is ever sent before `terminal:started`. The task that loses the race is
//! torn down by the eventual `close`.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::RecvError;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::event::{INPUT, InputPayload, START, StartPayload};
use crate::protocol::packet::PONG;
use crate::protocol::{Packet, ServerEvent, parse_event};
use crate::transport::Socket;

use super::session::{Assignment, Shared, SocketIoTerminal};

// ============================================================================
// Completion
// ============================================================================

/// Single-slot outcome shared by both forwarding tasks.
///
/// The first reported outcome wins; later reports are dropped.
pub(crate) struct Completion {
    slot: Mutex<Option<oneshot::Sender<Error>>>,
}

impl Completion {
    /// Creates the slot and the receiver `run` blocks on.
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Error>) {
        let (tx, rx) = oneshot::channel();
        let completion = Arc::new(Self {
            slot: Mutex::new(Some(tx)),
        });
        (completion, rx)
    }

    /// Reports a terminal outcome. Returns `false` if one was already reported.
    pub(crate) fn finish(&self, outcome: Error) -> bool {
        match self.slot.lock().take() {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => {
                trace!(error = %outcome, "Outcome already reported");
                false
            }
        }
    }
}

/// Unwraps a received outcome.
pub(crate) fn received(outcome: std::result::Result<Error, RecvError>) -> Error {
    outcome.unwrap_or_else(|_| {
        Error::Io(io::Error::other(
            "terminal task stopped without reporting an outcome",
        ))
    })
}

/// Maps end-of-stream outcomes to success.
pub(crate) fn conclude(outcome: Error) -> Result<()> {
    if outcome.is_end_of_stream() {
        debug!(reason = %outcome, "Terminal finished");
        Ok(())
    } else {
        Err(outcome)
    }
}

// ============================================================================
// Local I/O
// ============================================================================

/// Reads one chunk of local input, racing the socket's closed signal.
///
/// # Errors
///
/// - [`Error::InputClosed`] when input reaches end of stream
/// - [`Error::ConnectionClosed`] once the socket is closed
/// - [`Error::Io`] on a read failure
pub(crate) async fn read_chunk<R: AsyncRead + Unpin>(
    socket: &Socket,
    input: &mut R,
    buf: &mut [u8],
) -> Result<usize> {
    tokio::select! {
        biased;

        () = socket.closed() => Err(Error::ConnectionClosed),

        read = input.read(buf) => match read? {
            0 => {
                debug!("Local input reached end of stream");
                Err(Error::InputClosed)
            }
            n => Ok(n),
        },
    }
}

/// Writes remote output to the local sink.
///
/// Failures are logged and swallowed; the session keeps running.
pub(crate) async fn write_output<W: AsyncWrite + Unpin>(output: &mut W, data: &[u8]) {
    let written = async {
        output.write_all(data).await?;
        output.flush().await
    };

    if let Err(e) = written.await {
        debug!(error = %e, bytes = data.len(), "Local output write failed");
    }
}

// ============================================================================
// Run
// ============================================================================

impl SocketIoTerminal {
    /// Forwards input and output until the session ends.
    ///
    /// Sends `terminal:start`, waits for `terminal:started` (or an early
    /// end), then forwards local input in chunks. Blocks until the first of
    /// the two forwarding tasks finishes.
    ///
    /// Returns `Ok(())` when the server ends the session, the peer closes
    /// the connection, or local input is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::StartFailed`] if `terminal:start` cannot be sent
    /// - [`Error::ConnectionClosed`] if the terminal was already closed
    /// - [`Error::Server`] with the server's message on `terminal:error`
    /// - [`Error::ProtocolViolation`] on a malformed control frame
    /// - [`Error::WebSocket`] or [`Error::Io`] on transport or input failures
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = &self.shared;

        let start = StartPayload {
            sandbox_id: &shared.sandbox_id,
        };
        if let Err(e) = shared.emit(START, &start).await {
            return Err(match e {
                Error::ConnectionClosed => Error::ConnectionClosed,
                other => Error::start_failed(other.to_string()),
            });
        }
        debug!(sandbox_id = %shared.sandbox_id, "Terminal start sent");

        let (completion, mut done) = Completion::new();
        let (active_tx, active_rx) = oneshot::channel();

        tokio::spawn({
            let shared = Arc::clone(shared);
            let completion = Arc::clone(&completion);
            async move {
                let outcome = pump_inbound(&shared, output, active_tx).await;
                completion.finish(outcome);
            }
        });

        let session_id = tokio::select! {
            biased;

            outcome = &mut done => return conclude(received(outcome)),

            active = active_rx => match active {
                Ok(session_id) => session_id,
                // Inbound loop ended before the session became active.
                Err(_) => return conclude(received(done.await)),
            },
        };

        tokio::spawn({
            let shared = Arc::clone(shared);
            async move {
                let outcome = pump_outbound(&shared, &session_id, input).await;
                completion.finish(outcome);
            }
        });

        conclude(received(done.await))
    }
}

// ============================================================================
// Forwarding Loops
// ============================================================================

/// Socket → local output. Returns the outcome that ended the loop.
async fn pump_inbound<W: AsyncWrite + Unpin>(
    shared: &Shared,
    mut output: W,
    active: oneshot::Sender<SessionId>,
) -> Error {
    let mut active = Some(active);

    loop {
        let text = match shared.socket.recv_text().await {
            Ok(text) => text,
            Err(e) => return e,
        };

        let body = match Packet::classify(&text) {
            Some(Packet::Ping) => {
                trace!("Heartbeat ping");
                if let Err(e) = shared.socket.send_text(PONG.to_string()).await {
                    return e;
                }
                continue;
            }
            Some(Packet::Message(body)) => body,
            other => {
                trace!(packet = ?other, "Ignoring packet");
                continue;
            }
        };

        let Some(raw) = parse_event(body) else {
            trace!("Ignoring non-event message");
            continue;
        };

        let event = match ServerEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => return e,
        };

        match event {
            ServerEvent::Started { session_id } => {
                match shared.assign_session(session_id.clone()) {
                    Assignment::First { pending } => {
                        info!(%session_id, "Terminal session started");

                        if let Some((cols, rows)) = pending
                            && let Err(e) = shared.send_resize(&session_id, cols, rows).await
                        {
                            return e;
                        }

                        if let Some(tx) = active.take() {
                            let _ = tx.send(session_id);
                        }
                    }
                    Assignment::Repeated { current } => {
                        warn!(%current, ignored = %session_id, "Duplicate terminal:started");
                    }
                }
            }

            ServerEvent::Output { data } => {
                trace!(bytes = data.len(), "Terminal output");
                write_output(&mut output, &data).await;
            }

            ServerEvent::MalformedOutput => {
                debug!("Dropping malformed terminal:output frame");
            }

            ServerEvent::Error { message } => {
                warn!(%message, "Terminal error from server");
                return Error::server(message);
            }

            ServerEvent::Ended => {
                info!("Terminal session ended");
                return Error::SessionEnded;
            }

            ServerEvent::Unknown { name } => {
                trace!(%name, "Ignoring unknown event");
            }
        }
    }
}

/// Local input → socket. Returns the outcome that ended the loop.
async fn pump_outbound<R: AsyncRead + Unpin>(
    shared: &Shared,
    session_id: &SessionId,
    mut input: R,
) -> Error {
    let mut buf = vec![0u8; shared.options.chunk_size];

    loop {
        let n = match read_chunk(&shared.socket, &mut input, &mut buf).await {
            Ok(n) => n,
            Err(e) => return e,
        };

        trace!(bytes = n, "Terminal input");
        if let Err(e) = shared
            .emit(INPUT, &InputPayload::new(session_id, &buf[..n]))
            .await
        {
            return e;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
