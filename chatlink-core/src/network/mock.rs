// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory transport for tests and demos. Every socket opened through a
//! [`MockConnector`] has a [`MockServer`] handle that plays the remote end.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use url::Url;

use super::codec::{decode_envelope, encode_envelope};
use super::error::NetworkError;
use super::message::Envelope;
use super::transport::{
    CloseCode, Connector, Frame, Transport, TransportResult, TransportState,
};

/// Outcome of one scripted open.
#[derive(Debug, Clone)]
pub enum OpenOutcome {
    Accept,
    Refuse(NetworkError),
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<OpenOutcome>,
    /// Used once the script runs out; `None` accepts.
    fallback: Option<NetworkError>,
    urls: Vec<Url>,
    servers: Vec<MockServer>,
}

/// Connector that hands out in-memory sockets.
///
/// Opens succeed unless scripted otherwise.
///
/// # Example
///
/// ```ignore
/// let connector = MockConnector::new();
/// connector.refuse_next(NetworkError::Timeout);
///
/// // First attempt times out, the second gets a live socket.
/// let server = connector.wait_for_server(0).await;
/// server.push_envelope(&Envelope::pong());
/// ```
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
    opened: Arc<Notify>,
}

impl MockConnector {
    pub fn new() -> Self {
        MockConnector::default()
    }

    /// Queues an outcome for the next unscripted open.
    pub fn script(&self, outcome: OpenOutcome) {
        self.state.lock().script.push_back(outcome);
    }

    pub fn refuse_next(&self, error: NetworkError) {
        self.script(OpenOutcome::Refuse(error));
    }

    /// Refuses every open once the script is exhausted.
    pub fn refuse_all(&self, error: NetworkError) {
        self.state.lock().fallback = Some(error);
    }

    /// Accepts every open once the script is exhausted.
    pub fn accept_all(&self) {
        self.state.lock().fallback = None;
    }

    /// Number of open calls so far, successful or not.
    pub fn open_count(&self) -> usize {
        self.state.lock().urls.len()
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.state.lock().urls.clone()
    }

    /// Server end of the `index`-th accepted socket.
    pub fn server(&self, index: usize) -> Option<MockServer> {
        self.state.lock().servers.get(index).cloned()
    }

    pub fn last_server(&self) -> Option<MockServer> {
        self.state.lock().servers.last().cloned()
    }

    pub fn server_count(&self) -> usize {
        self.state.lock().servers.len()
    }

    /// Waits until at least `count` open calls have been made.
    pub async fn wait_for_opens(&self, count: usize) {
        loop {
            let notified = self.opened.notified();
            if self.open_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Waits for the `index`-th accepted socket and returns its server end.
    pub async fn wait_for_server(&self, index: usize) -> MockServer {
        loop {
            let notified = self.opened.notified();
            if let Some(server) = self.server(index) {
                return server;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, url: &Url, _timeout: Duration) -> TransportResult<Arc<dyn Transport>> {
        let result = {
            let mut state = self.state.lock();
            state.urls.push(url.clone());
            let outcome = state.script.pop_front().unwrap_or_else(|| match &state.fallback {
                Some(error) => OpenOutcome::Refuse(error.clone()),
                None => OpenOutcome::Accept,
            });
            match outcome {
                OpenOutcome::Accept => {
                    let (transport, server) = MockTransport::pair();
                    state.servers.push(server);
                    Ok(Arc::new(transport) as Arc<dyn Transport>)
                }
                OpenOutcome::Refuse(error) => Err(error),
            }
        };
        self.opened.notify_waiters();
        result
    }
}

struct Link {
    sent: Mutex<Vec<Frame>>,
    state: Mutex<TransportState>,
    local_close: Mutex<Option<CloseCode>>,
    fail_sends: Mutex<Option<NetworkError>>,
    activity: Notify,
}

/// Client end of an in-memory socket.
pub struct MockTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportResult<Frame>>>,
    link: Arc<Link>,
}

impl MockTransport {
    /// Creates a connected client/server pair.
    pub fn pair() -> (MockTransport, MockServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Arc::new(Link {
            sent: Mutex::new(Vec::new()),
            state: Mutex::new(TransportState::Open),
            local_close: Mutex::new(None),
            fail_sends: Mutex::new(None),
            activity: Notify::new(),
        });
        let transport = MockTransport {
            inbound: tokio::sync::Mutex::new(rx),
            link: Arc::clone(&link),
        };
        (transport, MockServer { inbound: tx, link })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        if let Some(error) = self.link.fail_sends.lock().clone() {
            return Err(error);
        }
        if *self.link.state.lock() != TransportState::Open {
            return Err(NetworkError::NotConnected);
        }
        self.link.sent.lock().push(frame);
        self.link.activity.notify_waiters();
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Frame> {
        if *self.link.state.lock() != TransportState::Open {
            return Err(NetworkError::ConnectionClosed);
        }
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(Ok(frame)) => {
                // Closing until the client answers the close.
                if matches!(frame, Frame::Close { .. }) {
                    *self.link.state.lock() = TransportState::Closing;
                }
                Ok(frame)
            }
            Some(Err(error)) => Err(error),
            None => {
                *self.link.state.lock() = TransportState::Closed;
                Err(NetworkError::ConnectionClosed)
            }
        }
    }

    async fn close(&self, code: CloseCode) -> TransportResult<()> {
        let mut state = self.link.state.lock();
        if *state != TransportState::Closed {
            *state = TransportState::Closed;
            *self.link.local_close.lock() = Some(code);
        }
        drop(state);
        self.link.activity.notify_waiters();
        Ok(())
    }

    fn state(&self) -> TransportState {
        *self.link.state.lock()
    }
}

/// Server end of an in-memory socket.
#[derive(Clone)]
pub struct MockServer {
    inbound: mpsc::UnboundedSender<TransportResult<Frame>>,
    link: Arc<Link>,
}

impl MockServer {
    /// Delivers a raw frame to the client.
    pub fn push_frame(&self, frame: Frame) {
        // The client may already have dropped its end.
        let _ = self.inbound.send(Ok(frame));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push_frame(Frame::Text(text.into()));
    }

    pub fn push_json(&self, value: &Value) {
        self.push_text(value.to_string());
    }

    /// Delivers an envelope encoded the same way the client encodes.
    pub fn push_envelope(&self, envelope: &Envelope) {
        if let Ok(bytes) = encode_envelope(envelope) {
            self.push_frame(Frame::Binary(bytes));
        }
    }

    /// Makes the client's pending or next `receive` fail.
    pub fn fail(&self, error: NetworkError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Closes from the server side with `code`.
    pub fn close(&self, code: CloseCode) {
        self.push_frame(Frame::Close {
            code: Some(code),
            reason: String::new(),
        });
    }

    /// Makes every client send fail with `error`, or succeed again on `None`.
    pub fn fail_sends(&self, error: Option<NetworkError>) {
        *self.link.fail_sends.lock() = error;
    }

    pub fn sent_frames(&self) -> Vec<Frame> {
        self.link.sent.lock().clone()
    }

    /// Data frames the client sent, decoded. Undecodable frames are skipped.
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.link
            .sent
            .lock()
            .iter()
            .filter_map(|frame| frame.data().and_then(|data| decode_envelope(data).ok()))
            .collect()
    }

    /// Waits until the client has sent at least `count` frames.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<Envelope> {
        loop {
            let notified = self.link.activity.notified();
            if self.link.sent.lock().len() >= count {
                return self.sent_envelopes();
            }
            notified.await;
        }
    }

    /// Code the client closed with, if it closed.
    pub fn client_close_code(&self) -> Option<CloseCode> {
        *self.link.local_close.lock()
    }

    pub fn is_closed(&self) -> bool {
        *self.link.state.lock() == TransportState::Closed
    }
}
