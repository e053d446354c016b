//! Duplex socket capability.
//!
//! The transport's reconnection and replay logic is written against these
//! traits so it can be exercised with an in-memory socket pair; the real
//! implementation is a WebSocket client.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::debug;

/// One frame on the wire: raw PCM16 audio bytes or a JSON control/event
/// message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    Binary(Vec<u8>),
    Text(String),
}

/// Write half of a connected socket.
#[async_trait::async_trait]
pub trait SocketSink: Send {
    async fn send(&mut self, frame: WireFrame) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Read half of a connected socket. `next()` returns `None` once the
/// connection is closed, cleanly or not.
#[async_trait::async_trait]
pub trait SocketStream: Send {
    async fn next(&mut self) -> Option<WireFrame>;
}

/// Establishes connections; owned by the transport so reconnects can dial
/// the (possibly updated) URL again.
#[async_trait::async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>)>;
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    tungstenite::Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

/// WebSocket connector used in production.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

#[async_trait::async_trait]
impl SocketConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>)> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("WebSocket connect to {} failed", url))?;
        let (tx, rx) = ws.split();
        Ok((Box::new(WsSinkHalf { tx }), Box::new(WsStreamHalf { rx })))
    }
}

struct WsSinkHalf {
    tx: WsSink,
}

#[async_trait::async_trait]
impl SocketSink for WsSinkHalf {
    async fn send(&mut self, frame: WireFrame) -> Result<()> {
        let msg = match frame {
            WireFrame::Binary(bytes) => tungstenite::Message::Binary(bytes),
            WireFrame::Text(text) => tungstenite::Message::Text(text),
        };
        self.tx.send(msg).await.context("WebSocket send failed")
    }

    async fn close(&mut self) -> Result<()> {
        self.tx.close().await.context("WebSocket close failed")
    }
}

struct WsStreamHalf {
    rx: WsStream,
}

#[async_trait::async_trait]
impl SocketStream for WsStreamHalf {
    async fn next(&mut self) -> Option<WireFrame> {
        loop {
            match self.rx.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(WireFrame::Text(text.to_string()))
                }
                Some(Ok(tungstenite::Message::Binary(bytes))) => {
                    return Some(WireFrame::Binary(bytes.to_vec()))
                }
                // Pings are answered by the library; skip control frames
                Some(Ok(tungstenite::Message::Ping(_)))
                | Some(Ok(tungstenite::Message::Pong(_)))
                | Some(Ok(tungstenite::Message::Frame(_))) => continue,
                Some(Ok(tungstenite::Message::Close(_))) | None => return None,
                Some(Err(e)) => {
                    debug!("WebSocket read error: {}", e);
                    return None;
                }
            }
        }
    }
}
