// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Typed fan-out of decoded server events to registered handlers.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

use crate::network::{
    ConnectionAck, ConnectionState, ConversationUnreadUpdate, ConversationUpdate, InboundEvent,
    MessageUpdate, NewMessage, ReadReceipt, TypingStatus, UserStatusChange,
};

/// Events emitted by a connection manager.
///
/// Each carries its decoded payload, never the raw envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Connection state changed.
    ConnectionStateChanged {
        /// The new connection state.
        state: ConnectionState,
    },

    /// The server confirmed the session.
    ConnectionConfirmed(ConnectionAck),

    /// A chat message arrived.
    NewMessage(NewMessage),

    /// A user's presence changed.
    UserStatusChanged(UserStatusChange),

    /// A user started or stopped typing.
    TypingStatusChanged(TypingStatus),

    /// An existing message was recalled, edited, deleted or changed status.
    MessageUpdated(MessageUpdate),

    /// Conversation metadata or membership changed.
    ConversationUpdated(ConversationUpdate),

    /// Unread count or last message of a conversation changed.
    ConversationUnreadUpdated(ConversationUnreadUpdate),

    /// Someone read a message.
    ReadReceipt(ReadReceipt),

    /// One of our messages was read.
    MessageRead(ReadReceipt),
}

impl ChatEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            ChatEvent::ConnectionStateChanged { .. } => EventTopic::ConnectionState,
            ChatEvent::ConnectionConfirmed(_) => EventTopic::ConnectionConfirmed,
            ChatEvent::NewMessage(_) => EventTopic::NewMessage,
            ChatEvent::UserStatusChanged(_) => EventTopic::UserStatus,
            ChatEvent::TypingStatusChanged(_) => EventTopic::Typing,
            ChatEvent::MessageUpdated(_) => EventTopic::MessageUpdated,
            ChatEvent::ConversationUpdated(_) => EventTopic::ConversationUpdated,
            ChatEvent::ConversationUnreadUpdated(_) => EventTopic::ConversationUnreadUpdated,
            ChatEvent::ReadReceipt(_) => EventTopic::ReadReceipt,
            ChatEvent::MessageRead(_) => EventTopic::MessageRead,
        }
    }

    /// Converts a decoded frame into the event consumers see.
    ///
    /// Heartbeat frames and unhandled kinds have no event.
    pub fn from_inbound(event: InboundEvent) -> Option<Self> {
        match event {
            InboundEvent::ConnectionAck(ack) => Some(ChatEvent::ConnectionConfirmed(ack)),
            InboundEvent::NewMessage(message) => Some(ChatEvent::NewMessage(message)),
            InboundEvent::UserStatus(change) => Some(ChatEvent::UserStatusChanged(change)),
            InboundEvent::Typing(status) => Some(ChatEvent::TypingStatusChanged(status)),
            InboundEvent::MessageUpdated(update) => Some(ChatEvent::MessageUpdated(update)),
            InboundEvent::ConversationUpdated(update) => {
                Some(ChatEvent::ConversationUpdated(update))
            }
            InboundEvent::ConversationUnreadUpdated(update) => {
                Some(ChatEvent::ConversationUnreadUpdated(update))
            }
            InboundEvent::ReadReceipt(receipt) => Some(ChatEvent::ReadReceipt(receipt)),
            InboundEvent::MessageRead(receipt) => Some(ChatEvent::MessageRead(receipt)),
            InboundEvent::Ping | InboundEvent::Pong | InboundEvent::Unhandled(_) => None,
        }
    }
}

/// One topic per event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    ConnectionState,
    ConnectionConfirmed,
    NewMessage,
    UserStatus,
    Typing,
    MessageUpdated,
    ConversationUpdated,
    ConversationUnreadUpdated,
    ReadReceipt,
    MessageRead,
}

impl EventTopic {
    pub const ALL: [EventTopic; 10] = [
        EventTopic::ConnectionState,
        EventTopic::ConnectionConfirmed,
        EventTopic::NewMessage,
        EventTopic::UserStatus,
        EventTopic::Typing,
        EventTopic::MessageUpdated,
        EventTopic::ConversationUpdated,
        EventTopic::ConversationUnreadUpdated,
        EventTopic::ReadReceipt,
        EventTopic::MessageRead,
    ];
}

/// Event handler trait.
///
/// Handlers run on the connection's dispatch task and must not block.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: ChatEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    fn on_event(&self, event: ChatEvent) {
        (self.callback)(event);
    }
}

/// Forwards events into an unbounded channel, for consumers that prefer to
/// `await` events instead of handling them inline.
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<ChatEvent>,
}

impl ChannelHandler {
    pub fn new(sender: mpsc::UnboundedSender<ChatEvent>) -> Self {
        ChannelHandler { sender }
    }

    /// Creates a handler together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelHandler { sender }, receiver)
    }
}

impl EventHandler for ChannelHandler {
    fn on_event(&self, event: ChatEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    /// `None` subscribes to every topic.
    topics: Option<HashSet<EventTopic>>,
    handler: Arc<dyn EventHandler>,
}

impl Registration {
    fn wants(&self, topic: EventTopic) -> bool {
        self.topics
            .as_ref()
            .map_or(true, |topics| topics.contains(&topic))
    }
}

/// Event dispatcher for managing multiple handlers.
///
/// Handlers may subscribe or unsubscribe from inside `on_event`; the change
/// applies from the next dispatch.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher::default()
    }

    /// Adds a handler for every topic.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.register(None, handler)
    }

    /// Adds a handler for a single topic.
    pub fn subscribe(&self, topic: EventTopic, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.register(Some(HashSet::from([topic])), handler)
    }

    /// Adds a handler for several topics.
    pub fn subscribe_topics(
        &self,
        topics: &[EventTopic],
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        self.register(Some(topics.iter().copied().collect()), handler)
    }

    fn register(
        &self,
        topics: Option<HashSet<EventTopic>>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(Registration {
            id,
            topics,
            handler,
        });
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|registration| registration.id != id);
        handlers.len() != before
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Dispatches an event to every handler subscribed to its topic, in
    /// registration order.
    ///
    /// A panicking handler is logged and skipped; the rest still run.
    pub fn dispatch(&self, event: ChatEvent) {
        let topic = event.topic();
        let targets: Vec<(SubscriptionId, Arc<dyn EventHandler>)> = self
            .handlers
            .read()
            .iter()
            .filter(|registration| registration.wants(topic))
            .map(|registration| (registration.id, Arc::clone(&registration.handler)))
            .collect();

        for (id, handler) in targets {
            let event = event.clone();
            if catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
                warn!(?topic, subscription = ?id, "Event handler panicked");
            }
        }
    }
}
