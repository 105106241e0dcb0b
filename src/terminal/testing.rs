//! In-process terminal server for tests.
//!
//! Binds `127.0.0.1:0`, accepts one WebSocket connection and hands it to a
//! script. Assertions inside the script surface through [`FakeServer::finish`].

use std::future::Future;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Sandbox ID used by scripted sessions.
pub(crate) const SANDBOX_ID: &str = "sbx-1";

/// Formats a server event frame in the `/terminal` namespace.
pub(crate) fn event(name: &str, payload: &str) -> String {
    format!(r#"42/terminal,["{name}",{payload}]"#)
}

/// Upgrade request details captured by the server.
#[derive(Debug, Default)]
struct Captured {
    target: Option<String>,
    authorization: Option<String>,
}

pub(crate) struct FakeServer {
    addr: std::net::SocketAddr,
    captured: Arc<Mutex<Captured>>,
    task: JoinHandle<()>,
}

impl FakeServer {
    /// Starts a server running `script` against the first connection.
    pub(crate) async fn spawn<F, Fut>(script: F) -> Self
    where
        F: FnOnce(Peer) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let captured = Arc::new(Mutex::new(Captured::default()));

        let task = tokio::spawn({
            let captured = Arc::clone(&captured);
            async move {
                let (stream, _) = listener.accept().await.expect("accept");
                let callback = move |request: &Request,
                                     response: Response|
                      -> Result<Response, ErrorResponse> {
                    let mut captured = captured.lock();
                    captured.target = Some(request.uri().to_string());
                    captured.authorization = request
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    Ok(response)
                };

                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };
                script(Peer { ws }).await;
            }
        });

        Self {
            addr,
            captured,
            task,
        }
    }

    /// Base URL as handed out by the REST collaborator.
    pub(crate) fn socket_io_url(&self) -> String {
        format!("http://{}/terminal", self.addr)
    }

    /// Direct WebSocket URL.
    pub(crate) fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    /// Path and query of the upgrade request.
    pub(crate) fn request_target(&self) -> Option<String> {
        self.captured.lock().target.clone()
    }

    /// `Authorization` header of the upgrade request.
    pub(crate) fn authorization(&self) -> Option<String> {
        self.captured.lock().authorization.clone()
    }

    /// Waits for the script, re-raising its assertion failures.
    pub(crate) async fn finish(self) {
        self.task.await.expect("server script");
    }
}

/// Server side of one connection.
pub(crate) struct Peer {
    ws: WebSocketStream<TcpStream>,
}

impl Peer {
    pub(crate) async fn send(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .expect("server send");
    }

    /// Next text frame, `None` once the client is gone.
    pub(crate) async fn recv(&mut self) -> Option<String> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    pub(crate) async fn expect(&mut self, expected: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(expected));
    }

    /// Engine.IO open followed by the namespace connect exchange.
    pub(crate) async fn accept_handshake(&mut self) {
        self.send(r#"0{"sid":"x","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
            .await;
        self.expect("40/terminal,").await;
        self.send(r#"40/terminal,{"sid":"ns1"}"#).await;
    }

    pub(crate) async fn expect_start(&mut self) {
        self.expect(&format!(
            r#"42/terminal,["terminal:start",{{"sandboxId":"{SANDBOX_ID}"}}]"#
        ))
        .await;
    }

    /// Expects `terminal:start` and acknowledges it with `session`.
    pub(crate) async fn accept_start(&mut self, session: &str) {
        self.expect_start().await;
        self.send(&event(
            "terminal:started",
            &format!(r#"{{"sessionId":"{session}"}}"#),
        ))
        .await;
    }

    /// Reads until the client goes away.
    pub(crate) async fn drain(&mut self) {
        while self.recv().await.is_some() {}
    }

    pub(crate) async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
