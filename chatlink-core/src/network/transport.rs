// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! Platform-agnostic abstraction for a single full-duplex message stream.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Connection state of the manager.
///
/// Exactly one value is current at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected, and not trying to.
    #[default]
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Connected and ready.
    Connected,
    /// The last attempt or the live connection failed.
    Failed(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionState::Failed(_))
    }

    /// Human-readable description for status displays.
    pub fn description(&self) -> String {
        match self {
            ConnectionState::Disconnected => "disconnected".to_string(),
            ConnectionState::Connecting => "connecting".to_string(),
            ConnectionState::Connected => "connected".to_string(),
            ConnectionState::Failed(reason) => format!("connection failed: {}", reason),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Lifecycle of one transport socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Open,
    Closing,
    Closed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Open => "open",
            TransportState::Closing => "closing",
            TransportState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// WebSocket close status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000
    Normal,
    /// 1001
    GoingAway,
    /// 1006
    Abnormal,
    Other(u16),
}

impl CloseCode {
    pub fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1006 => CloseCode::Abnormal,
            other => CloseCode::Other(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::Abnormal => 1006,
            CloseCode::Other(code) => code,
        }
    }

    /// Only a normal closure ends a session without reconnecting.
    pub fn is_normal(self) -> bool {
        matches!(self, CloseCode::Normal)
    }
}

/// A unit exchanged with a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Remote close; `code` is `None` when the peer sent no status.
    Close {
        code: Option<CloseCode>,
        reason: String,
    },
}

impl Frame {
    /// Returns the application payload of a data frame.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(text) => Some(text.as_bytes()),
            Frame::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A single connected message stream.
///
/// `send` may be called from many tasks at once while one task sits in
/// `receive`; implementations serialize writes internally. A transport is
/// never reused after it closes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one frame.
    async fn send(&self, frame: Frame) -> TransportResult<()>;

    /// Waits for the next frame.
    ///
    /// Returns `Err(NetworkError::ConnectionClosed)` once the stream has
    /// ended, and a [`Frame::Close`] when the peer closed it deliberately.
    async fn receive(&self) -> TransportResult<Frame>;

    /// Closes the stream. Safe to call more than once.
    async fn close(&self, code: CloseCode) -> TransportResult<()>;

    /// Returns the socket lifecycle state.
    fn state(&self) -> TransportState;
}

/// Opens transports. Each call yields a fresh socket.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &Url, timeout: Duration) -> TransportResult<Arc<dyn Transport>>;
}

/// Builds the connection target by attaching `token` as the `token` query
/// parameter of `base`.
pub fn connection_url(base: &str, token: &str) -> TransportResult<Url> {
    let mut url = Url::parse(base).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(NetworkError::InvalidUrl(format!(
                "unsupported scheme {} (expected ws or wss)",
                other
            )))
        }
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token);
    Ok(url)
}

/// Renders a URL for logs with its query string masked.
pub fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    redacted.set_query(None);
    format!("{}?token=<redacted>", redacted)
}
