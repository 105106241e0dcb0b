//! Owned WebSocket with serialized writes.
//!
//! The stream is split once at construction. Writers share the sink behind
//! an async mutex so concurrent sends (resize, heartbeat replies, input
//! forwarding) never interleave. Reads are free-running from one task at a
//! time. Closing is monotonic and wakes any pending read.

// ============================================================================
// Imports
// ============================================================================

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream, plain or TLS.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WsStream, Message>;

type WsSource = SplitStream<WsStream>;

// ============================================================================
// Socket
// ============================================================================

/// A text-frame WebSocket connection.
///
/// # Thread Safety
///
/// `Socket` is `Send + Sync`; share it behind an `Arc`.
pub struct Socket {
    /// Write half, `None` once closed.
    writer: Mutex<Option<WsSink>>,
    /// Read half.
    reader: Mutex<WsSource>,
    /// Closed flag, false → true only.
    closed: watch::Sender<bool>,
}

impl Socket {
    /// Opens a client connection.
    ///
    /// # Errors
    ///
    /// [`Error::WebSocket`] if the TCP connect, TLS or upgrade fails.
    pub async fn dial(request: Request) -> Result<Self> {
        let uri = request.uri().clone();
        let (stream, response) = tokio_tungstenite::connect_async(request).await?;

        debug!(%uri, status = %response.status(), "WebSocket connected");

        Ok(Self::from_stream(stream))
    }

    /// Wraps an established stream.
    #[must_use]
    pub fn from_stream(stream: WsStream) -> Self {
        let (sink, source) = stream.split();
        let (closed, _) = watch::channel(false);

        Self {
            writer: Mutex::new(Some(sink)),
            reader: Mutex::new(source),
            closed,
        }
    }

    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after [`close`](Self::close) or once the peer closed
    /// - [`Error::WebSocket`] on any other transport failure
    pub async fn send_text(&self, text: String) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(Error::ConnectionClosed)?;

        trace!(len = text.len(), "Sending frame");
        sink.send(Message::Text(text.into()))
            .await
            .map_err(map_ws_error)
    }

    /// Reads the next text frame.
    ///
    /// Binary frames and WebSocket-level control frames are skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] on local close, peer close, or end of stream
    /// - [`Error::WebSocket`] on any other transport failure
    pub async fn recv_text(&self) -> Result<String> {
        let mut closed = self.closed.subscribe();
        let mut reader = self.reader.lock().await;

        loop {
            let message = tokio::select! {
                biased;

                _ = closed.wait_for(|closed| *closed) => return Err(Error::ConnectionClosed),

                message = reader.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),

                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Ignoring binary frame");
                }

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    return Err(Error::ConnectionClosed);
                }

                // Ping, Pong, raw frames
                Some(Ok(_)) => {}

                Some(Err(e)) => return Err(map_ws_error(e)),

                None => {
                    debug!("WebSocket stream ended");
                    return Err(Error::ConnectionClosed);
                }
            }
        }
    }

    /// Returns `true` once the socket has been closed locally.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the socket has been closed locally.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Closes the connection.
    ///
    /// Idempotent: later calls return `Ok(())` without side effects.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(mut sink) = writer.take() else {
            return Ok(());
        };

        self.closed.send_replace(true);

        if let Err(e) = sink.close().await {
            debug!(error = %e, "WebSocket close handshake failed");
        }

        debug!("WebSocket closed");
        Ok(())
    }
}

/// Maps closed-connection errors to the end-of-stream variant.
fn map_ws_error(e: WsError) -> Error {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ConnectionClosed,
        other => Error::WebSocket(other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    async fn pair() -> (Socket, WebSocketStream<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio_tungstenite::accept_async(stream).await.expect("upgrade")
        });

        let request = url.as_str().into_client_request().expect("request");
        let socket = Socket::dial(request).await.expect("dial");
        (socket, server.await.expect("server task"))
    }

    #[tokio::test]
    async fn test_send_and_receive_text() {
        let (socket, mut server) = pair().await;

        socket.send_text("40".into()).await.expect("send");
        let frame = server.next().await.expect("frame").expect("ok");
        assert_eq!(frame.into_text().expect("text").as_str(), "40");

        server
            .send(Message::Binary(vec![1, 2, 3].into()))
            .await
            .expect("send binary");
        server.send(Message::Text("2".into())).await.expect("send");
        assert_eq!(socket.recv_text().await.expect("recv"), "2");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (socket, _server) = pair().await;

        assert!(!socket.is_closed());
        socket.close().await.expect("first close");
        socket.close().await.expect("second close");
        assert!(socket.is_closed());

        let err = socket.send_text("3".into()).await.unwrap_err();
        assert!(err.is_end_of_stream());
        let err = socket.recv_text().await.unwrap_err();
        assert!(err.is_end_of_stream());
    }

    #[tokio::test]
    async fn test_close_wakes_pending_read() {
        let (socket, _server) = pair().await;
        let socket = std::sync::Arc::new(socket);

        let reader = {
            let socket = std::sync::Arc::clone(&socket);
            tokio::spawn(async move { socket.recv_text().await })
        };

        tokio::task::yield_now().await;
        socket.close().await.expect("close");

        let result = reader.await.expect("reader task");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_peer_close_is_end_of_stream() {
        let (socket, mut server) = pair().await;

        server.close(None).await.expect("server close");
        let err = socket.recv_text().await.unwrap_err();
        assert!(err.is_end_of_stream());
    }
}
