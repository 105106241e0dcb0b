//! Plain JSON WebSocket terminal.
//!
//! For endpoints that speak bare JSON messages instead of Socket.IO. The
//! URL is dialed as given with the token in an `Authorization` header.
//!
//! # Message Format
//!
//! ```json
//! { "type": "data", "data": "ls\n" }
//! { "type": "resize", "cols": 80, "rows": 24 }
//! ```
//!
//! There is no session handshake: input forwarding starts immediately and
//! resizes are always sent.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::transport::Socket;

use super::builder::TerminalOptions;
use super::pump::{Completion, conclude, read_chunk, received, write_output};
use super::{LocalInput, LocalOutput, Terminal, within};

// ============================================================================
// WireMessage
// ============================================================================

/// One JSON message in either direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cols: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    rows: Option<u16>,
}

impl WireMessage {
    fn data(data: String) -> Self {
        Self {
            kind: "data".into(),
            data: Some(data),
            ..Default::default()
        }
    }

    fn resize(cols: u16, rows: u16) -> Self {
        Self {
            kind: "resize".into(),
            cols: Some(cols),
            rows: Some(rows),
            ..Default::default()
        }
    }
}

// ============================================================================
// JsonTerminal
// ============================================================================

struct JsonShared {
    socket: Socket,
    options: TerminalOptions,
}

impl JsonShared {
    async fn send(&self, message: &WireMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.socket.send_text(text).await
    }
}

/// Terminal tunnel over plain JSON messages.
#[derive(Clone)]
pub struct JsonTerminal {
    shared: Arc<JsonShared>,
}

impl JsonTerminal {
    /// Connects with default options.
    ///
    /// # Errors
    ///
    /// See [`connect_with`](Self::connect_with).
    pub async fn connect(url: &str, token: &str) -> Result<Self> {
        Self::connect_with(url, token, TerminalOptions::default()).await
    }

    /// Dials `url` with a bearer token header.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid or the token is not a valid header value
    /// - [`Error::InvalidUrl`] if `url` is not a WebSocket URL
    /// - [`Error::HandshakeFailed`] if the dial fails or times out
    pub async fn connect_with(url: &str, token: &str, options: TerminalOptions) -> Result<Self> {
        options.validate()?;

        let mut request = url
            .into_client_request()
            .map_err(|e| Error::invalid_url(url, e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::config(format!("invalid token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let socket = within(options.connect_timeout, async {
            Socket::dial(request)
                .await
                .map_err(|e| Error::handshake_failed(format!("failed to connect: {e}")))
        })
        .await?;

        info!(url, "JSON terminal connected");

        Ok(Self {
            shared: Arc::new(JsonShared { socket, options }),
        })
    }

    /// Sends the local terminal size.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if closed, [`Error::WebSocket`] on transport failure.
    pub async fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        debug!(cols, rows, "Sending resize");
        self.shared.send(&WireMessage::resize(cols, rows)).await
    }

    /// Forwards input and output until either side stops.
    ///
    /// Returns `Ok(())` on peer close or local input end of stream.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if already closed; transport or input
    /// failures otherwise.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.shared.socket.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let (completion, done) = Completion::new();

        tokio::spawn({
            let shared = Arc::clone(&self.shared);
            let completion = Arc::clone(&completion);
            async move {
                completion.finish(pump_inbound(&shared, output).await);
            }
        });

        tokio::spawn({
            let shared = Arc::clone(&self.shared);
            async move {
                completion.finish(pump_outbound(&shared, input).await);
            }
        });

        conclude(received(done.await))
    }

    /// Closes the connection. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.shared.socket.close().await
    }
}

#[async_trait]
impl Terminal for JsonTerminal {
    async fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        JsonTerminal::resize(self, cols, rows).await
    }

    async fn run(&self, input: LocalInput, output: LocalOutput) -> Result<()> {
        JsonTerminal::run(self, input, output).await
    }

    async fn close(&self) -> Result<()> {
        JsonTerminal::close(self).await
    }
}

// ============================================================================
// Forwarding Loops
// ============================================================================

async fn pump_inbound<W: AsyncWrite + Unpin>(shared: &JsonShared, mut output: W) -> Error {
    loop {
        let text = match shared.socket.recv_text().await {
            Ok(text) => text,
            Err(e) => return e,
        };

        match serde_json::from_str::<WireMessage>(&text) {
            Ok(message) if message.kind == "data" => {
                let data = message.data.unwrap_or_default();
                write_output(&mut output, data.as_bytes()).await;
            }
            Ok(message) => trace!(kind = %message.kind, "Ignoring message"),
            // Not JSON: raw terminal bytes.
            Err(_) => write_output(&mut output, text.as_bytes()).await,
        }
    }
}

async fn pump_outbound<R: AsyncRead + Unpin>(shared: &JsonShared, mut input: R) -> Error {
    let mut buf = vec![0u8; shared.options.chunk_size];

    loop {
        let n = match read_chunk(&shared.socket, &mut input, &mut buf).await {
            Ok(n) => n,
            Err(e) => return e,
        };

        let data = String::from_utf8_lossy(&buf[..n]).into_owned();
        if let Err(e) = shared.send(&WireMessage::data(data)).await {
            return e;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
