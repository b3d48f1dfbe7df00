//! In-process websocket server and store helpers shared by the async tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use notifeed_core::FeedState;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub const WAIT: Duration = Duration::from_secs(5);

pub type ServerSocket = WebSocketStream<TcpStream>;

/// Websocket server accepting any number of connections. Each accepted
/// socket is handed out together with its request URI.
pub struct WsServer {
    pub addr: SocketAddr,
    conns: mpsc::UnboundedReceiver<(String, ServerSocket)>,
}

impl WsServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, conns) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut uri = String::new();
                let callback = |req: &Request, resp: Response| {
                    uri = req.uri().to_string();
                    Ok::<Response, ErrorResponse>(resp)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                if tx.send((uri, ws)).is_err() {
                    return;
                }
            }
        });

        Self { addr, conns }
    }

    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Next accepted connection, or `None` if none arrives within `within`.
    pub async fn accept(&mut self, within: Duration) -> Option<(String, ServerSocket)> {
        tokio::time::timeout(within, self.conns.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Next text frame from the client, skipping control frames.
pub async fn next_text(ws: &mut ServerSocket) -> Option<String> {
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) | Err(_) => {
                return None;
            }
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Wait until the store satisfies `pred`, panicking after [`WAIT`].
pub async fn wait_for(
    rx: &mut watch::Receiver<FeedState>,
    pred: impl FnMut(&FeedState) -> bool,
) -> FeedState {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for feed state")
        .expect("feed store dropped")
        .clone()
}
