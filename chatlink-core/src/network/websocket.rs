// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Real transport implementation using tokio-tungstenite. TLS (wss://) is
//! provided by rustls with the ring backend when the `network-rustls`
//! feature is enabled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use super::error::NetworkError;
use super::transport::{
    CloseCode, Connector, Frame, Transport, TransportResult, TransportState,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens [`WebSocketTransport`]s.
///
/// # Example
///
/// ```ignore
/// use chatlink_core::network::{connection_url, Connector, WebSocketConnector};
///
/// let url = connection_url("wss://chat.example.com/ws", &token)?;
/// let transport = WebSocketConnector::new()
///     .open(&url, Duration::from_secs(15))
///     .await?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        WebSocketConnector
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &Url, timeout: Duration) -> TransportResult<Arc<dyn Transport>> {
        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (stream, response) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|e| {
                NetworkError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
            })?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Arc::new(WebSocketTransport::new(stream)))
    }
}

/// WebSocket transport for one connection.
///
/// The stream is split so a pending `receive` never blocks `send`.
pub struct WebSocketTransport {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    stream: tokio::sync::Mutex<SplitStream<WsStream>>,
    state: Mutex<TransportState>,
}

impl WebSocketTransport {
    fn new(stream: WsStream) -> Self {
        let (sink, stream) = stream.split();
        WebSocketTransport {
            sink: tokio::sync::Mutex::new(sink),
            stream: tokio::sync::Mutex::new(stream),
            state: Mutex::new(TransportState::Open),
        }
    }

    fn set_state(&self, state: TransportState) {
        *self.state.lock() = state;
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        if self.state() != TransportState::Open {
            return Err(NetworkError::NotConnected);
        }

        let mut sink = self.sink.lock().await;
        sink.send(to_message(frame)).await.map_err(|e| {
            if matches!(
                e,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ) {
                self.set_state(TransportState::Closed);
                NetworkError::ConnectionClosed
            } else {
                NetworkError::SendFailed(e.to_string())
            }
        })
    }

    async fn receive(&self) -> TransportResult<Frame> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(message)) => {
                    if let Some(frame) = from_message(message) {
                        // The reply goes out with the next flush, in `close`.
                        if matches!(frame, Frame::Close { .. }) {
                            self.set_state(TransportState::Closing);
                        }
                        return Ok(frame);
                    }
                }
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ))
                | None => {
                    self.set_state(TransportState::Closed);
                    return Err(NetworkError::ConnectionClosed);
                }
                Some(Err(e)) => return Err(NetworkError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&self, code: CloseCode) -> TransportResult<()> {
        if self.state() == TransportState::Closed {
            return Ok(());
        }
        self.set_state(TransportState::Closing);

        let mut sink = self.sink.lock().await;
        let close = Message::Close(Some(CloseFrame {
            code: code.as_u16().into(),
            reason: "".into(),
        }));
        // The peer may already be gone; closing is best effort.
        let _ = sink.send(close).await;
        let _ = sink.close().await;

        self.set_state(TransportState::Closed);
        Ok(())
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
        Frame::Ping(bytes) => Message::Ping(bytes),
        Frame::Pong(bytes) => Message::Pong(bytes),
        Frame::Close { code, reason } => Message::Close(code.map(|code| CloseFrame {
            code: code.as_u16().into(),
            reason: reason.into(),
        })),
    }
}

/// Raw frames never surface from a read and map to `None`.
fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Ping(bytes) => Some(Frame::Ping(bytes)),
        Message::Pong(bytes) => Some(Frame::Pong(bytes)),
        Message::Close(close) => Some(match close {
            Some(close) => Frame::Close {
                code: Some(CloseCode::from_u16(close.code.into())),
                reason: close.reason.into_owned(),
            },
            None => Frame::Close {
                code: None,
                reason: String::new(),
            },
        }),
        Message::Frame(_) => None,
    }
}
