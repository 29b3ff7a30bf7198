// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager
//!
//! Manages the connection lifecycle: heartbeat, reconnection with capped
//! backoff, network-path changes and routing of decoded server events.
//!
//! All connection-scoped state is owned by one driver task. Handles talk to
//! it over a command channel; the only work done on the caller's task is
//! `send`, which goes straight to the transport.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::codec::{decode_event_bytes, encode_envelope, DecodeContext};
use super::error::NetworkError;
use super::heartbeat::HeartbeatScheduler;
use super::message::{Envelope, InboundEvent, TypingStatus, UserId, UserStatus};
use super::reachability::{NetworkMonitor, NetworkPath};
use super::reconnect::ReconnectPolicy;
use super::transport::{
    connection_url, redact_url, CloseCode, ConnectionState, Connector, Frame, Transport,
    TransportResult,
};
#[cfg(feature = "network-rustls")]
use super::websocket::WebSocketConnector;
use crate::api::{
    ChannelHandler, ChatEvent, CredentialProvider, EventDispatcher, EventHandler, EventTopic,
    LocalNotification, NoopNotifications, NotificationSink, StaticCredentials, SubscriptionId,
};
use crate::config::ConnectionConfig;

const REASON_MISSING_CREDENTIAL: &str = "missing credential";
const REASON_RECONNECT_FAILED: &str = "reconnect failed";
const REASON_NETWORK_LOST: &str = "network lost";
const REASON_HEARTBEAT_TIMEOUT: &str = "heartbeat timeout";

type Ack = oneshot::Sender<Result<(), NetworkError>>;

enum Command {
    Connect(Ack),
    Disconnect(Ack),
    ManualReconnect(Ack),
    CheckHealth(Ack),
    /// A caller-side send failed on connection `connection_id`.
    TransportFailed {
        connection_id: u64,
        error: NetworkError,
    },
    Shutdown(Ack),
}

#[derive(Clone)]
struct LiveTransport {
    id: u64,
    transport: Arc<dyn Transport>,
}

/// State readable from any handle. Written only by the driver.
#[derive(Default)]
struct Shared {
    presence: RwLock<HashMap<UserId, UserStatus>>,
    typing: RwLock<HashMap<String, BTreeSet<UserId>>>,
    live: RwLock<Option<LiveTransport>>,
    attempts: AtomicU32,
}

#[cfg(feature = "network-rustls")]
fn default_connector() -> Arc<dyn Connector> {
    Arc::new(WebSocketConnector::new())
}

#[cfg(not(feature = "network-rustls"))]
fn default_connector() -> Arc<dyn Connector> {
    Arc::new(NoTransport)
}

/// Refuses every open; used when no network transport is compiled in.
#[cfg(not(feature = "network-rustls"))]
struct NoTransport;

#[cfg(not(feature = "network-rustls"))]
#[async_trait::async_trait]
impl Connector for NoTransport {
    async fn open(
        &self,
        _url: &url::Url,
        _timeout: std::time::Duration,
    ) -> TransportResult<Arc<dyn Transport>> {
        Err(NetworkError::ConnectionFailed(
            "built without a network transport".to_string(),
        ))
    }
}

/// Builder for [`ConnectionManager`].
///
/// Unset collaborators default to the WebSocket connector (when the
/// `network-rustls` feature is on), empty
/// credentials, an always-up network monitor and no local notifications.
pub struct ConnectionManagerBuilder {
    config: ConnectionConfig,
    connector: Option<Arc<dyn Connector>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    monitor: Option<NetworkMonitor>,
    notifications: Option<Arc<dyn NotificationSink>>,
    dispatcher: Option<Arc<EventDispatcher>>,
}

impl ConnectionManagerBuilder {
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn network_monitor(mut self, monitor: NetworkMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Shares an existing dispatcher instead of creating one.
    pub fn dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Spawns the driver task. Must be called within a Tokio runtime.
    pub fn build(self) -> ConnectionManager {
        let connector = self
            .connector
            .unwrap_or_else(default_connector);
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(StaticCredentials::default()));
        let monitor = self.monitor.unwrap_or_default();
        let notifications = self
            .notifications
            .unwrap_or_else(|| Arc::new(NoopNotifications));
        let dispatcher = self.dispatcher.unwrap_or_default();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared::default());
        let network = monitor.transitions();
        let network_up = monitor.current().is_satisfied();
        let policy = ReconnectPolicy::from_config(&self.config);

        let driver = Driver {
            heartbeat: HeartbeatScheduler::new(
                self.config.heartbeat_interval,
                self.config.liveness_timeout,
            ),
            config: self.config,
            policy,
            connector,
            credentials: Arc::clone(&credentials),
            notifications,
            dispatcher: Arc::clone(&dispatcher),
            shared: Arc::clone(&shared),
            state: state_tx,
            commands: command_rx,
            network,
            network_open: true,
            network_up,
            next_connection_id: 0,
            live: None,
            opening: None,
            reconnect_at: None,
            settle_at: None,
            session_active: false,
        };
        tokio::spawn(driver.run());

        ConnectionManager {
            inner: Arc::new(Handle {
                commands: command_tx,
                state: state_rx,
                shared,
                dispatcher,
                credentials,
                max_attempts: policy.max_attempts(),
            }),
        }
    }
}

struct Handle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    shared: Arc<Shared>,
    dispatcher: Arc<EventDispatcher>,
    credentials: Arc<dyn CredentialProvider>,
    max_attempts: u32,
}

/// Real-time connection to the chat server.
///
/// Cheap to clone; all clones drive the same connection. When the last
/// clone is dropped the connection is closed normally and the driver task
/// exits.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use chatlink_core::api::{CallbackHandler, EventTopic, StaticCredentials};
/// use chatlink_core::network::ConnectionManager;
/// use chatlink_core::ConnectionConfig;
///
/// let manager = ConnectionManager::builder(ConnectionConfig::from_env())
///     .credentials(Arc::new(StaticCredentials::with_token(token)))
///     .build();
///
/// manager.subscribe(
///     EventTopic::NewMessage,
///     Arc::new(CallbackHandler::new(|event| println!("{:?}", event))),
/// );
/// manager.connect().await?;
/// manager.join_conversation("42").await?;
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Handle>,
}

impl ConnectionManager {
    pub fn builder(config: ConnectionConfig) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder {
            config,
            connector: None,
            credentials: None,
            monitor: None,
            notifications: None,
            dispatcher: None,
        }
    }

    /// Creates a manager with the given connector and credentials.
    pub fn new(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self::builder(config)
            .connector(connector)
            .credentials(credentials)
            .build()
    }

    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<(), NetworkError> {
        let (ack, done) = oneshot::channel();
        self.inner
            .commands
            .send(command(ack))
            .map_err(|_| NetworkError::ManagerStopped)?;
        done.await.map_err(|_| NetworkError::ManagerStopped)?
    }

    /// Starts connecting. No-op if already connected or connecting.
    ///
    /// Returns once the attempt has started; the outcome is observable
    /// through [`state`](Self::state). Fails fast without a bearer token.
    pub async fn connect(&self) -> Result<(), NetworkError> {
        self.request(Command::Connect).await
    }

    /// Closes the connection and cancels all timers. Idempotent.
    ///
    /// No event is dispatched after this returns.
    pub async fn disconnect(&self) -> Result<(), NetworkError> {
        self.request(Command::Disconnect).await
    }

    /// Resets the attempt counter, drops the current connection and
    /// connects again immediately.
    pub async fn manual_reconnect(&self) -> Result<(), NetworkError> {
        self.request(Command::ManualReconnect).await
    }

    /// Alias for [`manual_reconnect`](Self::manual_reconnect).
    pub async fn reconnect(&self) -> Result<(), NetworkError> {
        self.manual_reconnect().await
    }

    /// Connects if not connected, otherwise sends a heartbeat.
    pub async fn check_connection_health(&self) -> Result<(), NetworkError> {
        self.request(Command::CheckHealth).await
    }

    /// Stops the driver task after a normal-closure disconnect.
    ///
    /// Every later call on any clone fails with `ManagerStopped`.
    pub async fn shutdown(&self) -> Result<(), NetworkError> {
        self.request(Command::Shutdown).await
    }

    /// Sends an envelope on the live connection.
    ///
    /// Fails with `NotConnected` unless connected. A transport failure is
    /// reported to the driver, which fails the connection and reconnects.
    pub async fn send(&self, envelope: Envelope) -> Result<(), NetworkError> {
        if !self.inner.state.borrow().is_connected() {
            debug!(kind = %envelope.kind, "Dropping send while not connected");
            return Err(NetworkError::NotConnected);
        }
        let live = self
            .inner
            .shared
            .live
            .read()
            .clone()
            .ok_or(NetworkError::NotConnected)?;

        let bytes = encode_envelope(&envelope).map_err(|e| {
            warn!(kind = %envelope.kind, error = %e, "Failed to encode outgoing envelope");
            e
        })?;

        if let Err(error) = live.transport.send(Frame::Binary(bytes)).await {
            warn!(kind = %envelope.kind, error = %error, "Send failed");
            let _ = self.inner.commands.send(Command::TransportFailed {
                connection_id: live.id,
                error: error.clone(),
            });
            return Err(error);
        }
        Ok(())
    }

    pub async fn send_heartbeat(&self) -> Result<(), NetworkError> {
        self.send(Envelope::ping()).await
    }

    pub async fn join_conversation(&self, conversation_id: &str) -> Result<(), NetworkError> {
        self.send(Envelope::join_conversation(conversation_id)).await
    }

    pub async fn leave_conversation(&self, conversation_id: &str) -> Result<(), NetworkError> {
        self.send(Envelope::leave_conversation(conversation_id)).await
    }

    /// Tells the conversation that the signed-in user is or stopped typing.
    pub async fn send_typing_status(
        &self,
        conversation_id: &str,
        is_typing: bool,
    ) -> Result<(), NetworkError> {
        let user_id = self
            .inner
            .credentials
            .current_user()
            .map_or(0, |user| user.id);
        let status = TypingStatus {
            conversation_id: conversation_id.to_string(),
            user_id,
            is_typing,
        };
        self.send(Envelope::typing(&status)).await
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    /// Watch channel carrying every state transition.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.attempts.load(Ordering::Acquire)
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Users currently typing in a conversation, in ascending id order.
    pub fn typing_users(&self, conversation_id: &str) -> Vec<UserId> {
        self.inner
            .shared
            .typing
            .read()
            .get(conversation_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn typing_snapshot(&self) -> HashMap<String, BTreeSet<UserId>> {
        self.inner.shared.typing.read().clone()
    }

    pub fn user_status(&self, user_id: UserId) -> Option<UserStatus> {
        self.inner.shared.presence.read().get(&user_id).copied()
    }

    pub fn presence_snapshot(&self) -> HashMap<UserId, UserStatus> {
        self.inner.shared.presence.read().clone()
    }

    /// Multi-line status for diagnostics.
    pub fn detailed_connection_status(&self) -> String {
        let state = self.state();
        let transport = self
            .inner
            .shared
            .live
            .read()
            .as_ref()
            .map_or_else(|| "none".to_string(), |live| live.transport.state().to_string());
        format!(
            "Connection status:\n\
             - connected: {}\n\
             - state: {}\n\
             - reconnect attempts: {}/{}\n\
             - transport: {}\n",
            if state.is_connected() { "yes" } else { "no" },
            state.description(),
            self.reconnect_attempts(),
            self.inner.max_attempts,
            transport,
        )
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    /// Registers a handler for one topic.
    pub fn subscribe(&self, topic: EventTopic, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.inner.dispatcher.subscribe(topic, handler)
    }

    /// Registers a handler for every topic.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.inner.dispatcher.add_handler(handler)
    }

    /// Returns a channel receiving every event on `topics`.
    pub fn subscribe_channel(
        &self,
        topics: &[EventTopic],
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<ChatEvent>) {
        let (handler, receiver) = ChannelHandler::channel();
        let id = self
            .inner
            .dispatcher
            .subscribe_topics(topics, Arc::new(handler));
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }
}

type Opening = BoxFuture<'static, (u64, TransportResult<Arc<dyn Transport>>)>;

struct Driver {
    config: ConnectionConfig,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialProvider>,
    notifications: Arc<dyn NotificationSink>,
    dispatcher: Arc<EventDispatcher>,
    shared: Arc<Shared>,
    state: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedReceiver<Command>,
    network: broadcast::Receiver<NetworkPath>,
    /// False once the monitor has been dropped.
    network_open: bool,
    network_up: bool,
    heartbeat: HeartbeatScheduler,
    next_connection_id: u64,
    live: Option<LiveTransport>,
    opening: Option<Opening>,
    reconnect_at: Option<Instant>,
    settle_at: Option<Instant>,
    /// True from a connect until an explicit disconnect or a normal close.
    session_active: bool,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let live = self.live.clone();
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        self.end_session().await;
                        break;
                    }
                },

                transition = self.network.recv(), if self.network_open => match transition {
                    Ok(path) => self.on_network_path(path).await,
                    Err(RecvError::Lagged(skipped)) => {
                        // A loss was among the skipped; what is still buffered restores.
                        warn!(skipped, "Missed network transitions");
                        self.on_network_path(NetworkPath::unsatisfied()).await;
                    }
                    Err(RecvError::Closed) => self.network_open = false,
                },

                (id, result) = until_open(&mut self.opening), if self.opening.is_some() => {
                    self.opening = None;
                    self.on_open(id, result);
                }

                // Ahead of frames so a busy stream cannot starve the heartbeat.
                _ = sleep_until(self.heartbeat.next_ping()) => self.on_ping_due().await,

                (id, result) = next_frame(live) => self.on_frame(id, result).await,

                _ = sleep_until(self.heartbeat.liveness_deadline()) => {
                    warn!("No traffic within liveness timeout");
                    self.fail_connection(REASON_HEARTBEAT_TIMEOUT.to_string()).await;
                }

                _ = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    info!(attempt = self.attempts(), "Reconnecting");
                    let _ = self.begin_connect();
                }

                _ = sleep_until(self.settle_at) => {
                    self.settle_at = None;
                    self.on_network_settled();
                }
            }
        }
        debug!("Connection driver stopped");
    }

    /// Returns false once the driver should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect(ack) => {
                let result = match self.current_state() {
                    ConnectionState::Connected | ConnectionState::Connecting => Ok(()),
                    _ => self.begin_connect(),
                };
                let _ = ack.send(result);
            }
            Command::Disconnect(ack) => {
                self.end_session().await;
                let _ = ack.send(Ok(()));
            }
            Command::ManualReconnect(ack) => {
                info!("Manual reconnect");
                self.set_attempts(0);
                self.close_transport(CloseCode::Normal).await;
                let _ = ack.send(self.begin_connect());
            }
            Command::CheckHealth(ack) => {
                let result = match self.current_state() {
                    ConnectionState::Connected => {
                        debug!("Health check: sending heartbeat");
                        self.on_ping_due().await;
                        Ok(())
                    }
                    ConnectionState::Connecting => Ok(()),
                    _ => {
                        info!("Health check: not connected, connecting");
                        self.begin_connect()
                    }
                };
                let _ = ack.send(result);
            }
            Command::TransportFailed {
                connection_id,
                error,
            } => {
                let current = self.live.as_ref().map(|live| live.id);
                if current == Some(connection_id) {
                    self.fail_connection(format!("send failed: {}", error))
                        .await;
                }
            }
            Command::Shutdown(ack) => {
                self.end_session().await;
                let _ = ack.send(Ok(()));
                return false;
            }
        }
        true
    }

    /// Starts a new connection attempt with a fresh transport.
    fn begin_connect(&mut self) -> Result<(), NetworkError> {
        self.reconnect_at = None;
        self.settle_at = None;

        let Some(token) = self.credentials.token().filter(|token| !token.is_empty()) else {
            warn!("Cannot connect without a bearer token");
            self.set_state(ConnectionState::Failed(
                REASON_MISSING_CREDENTIAL.to_string(),
            ));
            return Err(NetworkError::MissingCredential);
        };
        let url = match connection_url(&self.config.server_url, &token) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Invalid server URL");
                self.set_state(ConnectionState::Failed(e.to_string()));
                return Err(e);
            }
        };

        self.session_active = true;
        self.next_connection_id += 1;
        let id = self.next_connection_id;
        info!(url = %redact_url(&url), connection = id, "Connecting");
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let timeout = self.config.connect_timeout;
        self.opening = Some(
            async move {
                let result = connector.open(&url, timeout).await;
                (id, result)
            }
            .boxed(),
        );
        Ok(())
    }

    fn on_open(&mut self, id: u64, result: TransportResult<Arc<dyn Transport>>) {
        match result {
            Ok(transport) => {
                let live = LiveTransport { id, transport };
                *self.shared.live.write() = Some(live.clone());
                self.live = Some(live);
                self.set_attempts(0);
                self.heartbeat.start(Instant::now());
                info!(connection = id, "Connected");
                self.set_state(ConnectionState::Connected);
            }
            Err(e) => {
                warn!(connection = id, error = %e, "Connection attempt failed");
                self.set_state(ConnectionState::Failed(e.to_string()));
                self.schedule_reconnect();
            }
        }
    }

    async fn on_frame(&mut self, id: u64, result: TransportResult<Frame>) {
        if self.live.as_ref().map(|live| live.id) != Some(id) {
            return;
        }
        match result {
            Ok(frame) => {
                self.heartbeat.record_activity(Instant::now());
                match frame {
                    Frame::Text(text) => self.on_data(text.as_bytes()).await,
                    Frame::Binary(bytes) => self.on_data(&bytes).await,
                    Frame::Ping(_) | Frame::Pong(_) => {}
                    Frame::Close { code, reason } => self.on_remote_close(code, reason).await,
                }
            }
            Err(e) => self.fail_connection(e.to_string()).await,
        }
    }

    async fn on_remote_close(&mut self, code: Option<CloseCode>, reason: String) {
        if code.is_some_and(CloseCode::is_normal) {
            info!(reason, "Server closed the connection");
            self.session_active = false;
            self.close_transport(CloseCode::Normal).await;
            self.set_attempts(0);
            self.set_state(ConnectionState::Disconnected);
        } else {
            let code = code.map_or_else(|| "no status".to_string(), |c| c.as_u16().to_string());
            self.fail_connection(format!("closed by server ({})", code))
                .await;
        }
    }

    async fn on_data(&mut self, data: &[u8]) {
        let context = DecodeContext::new(self.credentials.current_user());
        let event = match decode_event_bytes(data, &context) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };
        debug!(kind = %event.kind(), "Received");

        // Tables are updated before anyone hears about the change.
        match &event {
            InboundEvent::Ping => {
                if let Err(e) = self.send_envelope(&Envelope::pong()).await {
                    self.fail_connection(format!("send failed: {}", e)).await;
                    return;
                }
            }
            InboundEvent::ConnectionAck(ack) if ack.is_connected() => {
                info!(user = ack.user_id, "Server confirmed connection");
            }
            InboundEvent::ConnectionAck(ack) => {
                warn!(user = ack.user_id, status = %ack.status, "Unexpected connection status");
            }
            InboundEvent::UserStatus(change) => {
                self.shared
                    .presence
                    .write()
                    .insert(change.user_id, change.status);
            }
            InboundEvent::Typing(status) => self.apply_typing(status),
            InboundEvent::Unhandled(envelope) => {
                debug!(kind = %envelope.kind, "No handler for message kind");
            }
            _ => {}
        }

        let notification = match &event {
            InboundEvent::NewMessage(new) if self.notifications.should_notify(&new.conversation_id) => {
                Some(LocalNotification::for_message(&new.message))
            }
            _ => None,
        };

        if let Some(event) = ChatEvent::from_inbound(event) {
            self.dispatcher.dispatch(event);
        }
        if let Some(notification) = notification {
            debug!(conversation = %notification.conversation_id, "Scheduling local notification");
            self.notifications.schedule(notification);
        }
    }

    fn apply_typing(&self, status: &TypingStatus) {
        let mut typing = self.shared.typing.write();
        if status.is_typing {
            typing
                .entry(status.conversation_id.clone())
                .or_default()
                .insert(status.user_id);
        } else if let Some(users) = typing.get_mut(&status.conversation_id) {
            users.remove(&status.user_id);
            if users.is_empty() {
                typing.remove(&status.conversation_id);
            }
        }
    }

    async fn on_ping_due(&mut self) {
        self.heartbeat.on_ping_sent(Instant::now());
        if let Err(e) = self.send_envelope(&Envelope::ping()).await {
            self.fail_connection(format!("heartbeat failed: {}", e))
                .await;
        }
    }

    async fn on_network_path(&mut self, path: NetworkPath) {
        let was_up = self.network_up;
        self.network_up = path.is_satisfied();

        match (was_up, self.network_up) {
            (true, false) => {
                // Nothing can succeed offline; restore reconnects the session.
                self.reconnect_at = None;
                self.settle_at = None;
                if matches!(
                    self.current_state(),
                    ConnectionState::Connected | ConnectionState::Connecting
                ) {
                    warn!("Network lost");
                    self.stop_connection();
                    self.set_state(ConnectionState::Failed(REASON_NETWORK_LOST.to_string()));
                }
            }
            (false, true) => {
                let idle = matches!(
                    self.current_state(),
                    ConnectionState::Disconnected | ConnectionState::Failed(_)
                );
                if idle && self.session_active {
                    info!(
                        settle_ms = self.config.network_settle_delay.as_millis() as u64,
                        "Network restored, reconnecting after settle delay"
                    );
                    self.set_attempts(0);
                    self.reconnect_at = None;
                    self.settle_at = Some(Instant::now() + self.config.network_settle_delay);
                }
            }
            _ => {}
        }
    }

    fn on_network_settled(&mut self) {
        let idle = matches!(
            self.current_state(),
            ConnectionState::Disconnected | ConnectionState::Failed(_)
        );
        if self.network_up && idle && self.session_active {
            let _ = self.begin_connect();
        }
    }

    /// Tears down a failed connection and schedules the next attempt.
    async fn fail_connection(&mut self, reason: String) {
        warn!(reason, "Connection failed");
        self.close_transport(CloseCode::GoingAway).await;
        self.set_state(ConnectionState::Failed(reason));
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let has_credential = self.credentials.has_token();
        let attempts = self.attempts();
        if !self.policy.should_retry(attempts, has_credential) {
            let reason = if has_credential {
                REASON_RECONNECT_FAILED
            } else {
                REASON_MISSING_CREDENTIAL
            };
            warn!(attempts, reason, "Giving up on automatic reconnect");
            self.reconnect_at = None;
            self.set_state(ConnectionState::Failed(reason.to_string()));
            return;
        }

        let attempt = attempts + 1;
        self.set_attempts(attempt);
        let delay = self.policy.delay_for(attempt);
        info!(
            attempt,
            max = self.policy.max_attempts(),
            delay_secs = delay.as_secs(),
            "Scheduling reconnect"
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    /// Explicit disconnect, shutdown or last handle dropped.
    async fn end_session(&mut self) {
        self.heartbeat.stop();
        self.session_active = false;
        self.reconnect_at = None;
        self.settle_at = None;
        self.close_transport(CloseCode::Normal).await;
        self.set_attempts(0);
        self.set_state(ConnectionState::Disconnected);
    }

    /// Stops the heartbeat, abandons any attempt in flight and forgets the
    /// transport without a closing handshake.
    fn stop_connection(&mut self) -> Option<Arc<dyn Transport>> {
        self.heartbeat.stop();
        self.opening = None;
        self.shared.typing.write().clear();
        *self.shared.live.write() = None;
        self.live.take().map(|live| live.transport)
    }

    async fn close_transport(&mut self, code: CloseCode) {
        if let Some(transport) = self.stop_connection() {
            if tokio::time::timeout(self.config.close_timeout, transport.close(code))
                .await
                .is_err()
            {
                debug!("Closing handshake timed out");
            }
        }
    }

    async fn send_envelope(&mut self, envelope: &Envelope) -> Result<(), NetworkError> {
        let live = self.live.as_ref().ok_or(NetworkError::NotConnected)?;
        let bytes = match encode_envelope(envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(kind = %envelope.kind, error = %e, "Failed to encode outgoing envelope");
                return Ok(());
            }
        };
        live.transport.send(Frame::Binary(bytes)).await
    }

    fn current_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            info!(state = %next, "Connection state changed");
            self.dispatcher
                .dispatch(ChatEvent::ConnectionStateChanged { state: next });
        }
    }

    fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::Acquire)
    }

    fn set_attempts(&self, attempts: u32) {
        self.shared.attempts.store(attempts, Ordering::Release);
    }
}

async fn until_open(opening: &mut Option<Opening>) -> (u64, TransportResult<Arc<dyn Transport>>) {
    match opening {
        Some(opening) => opening.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(live: Option<LiveTransport>) -> (u64, TransportResult<Frame>) {
    match live {
        Some(live) => (live.id, live.transport.receive().await),
        None => std::future::pending().await,
    }
}

fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
