// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chatlink Core Library
//!
//! Client-side real-time connection manager for the chat service: keeps a
//! WebSocket session alive across failures and network changes, and
//! decodes server frames into typed events.

pub mod api;
pub mod config;
pub mod network;

pub use api::{
    CallbackHandler, ChatEvent, CredentialProvider, EventDispatcher, EventHandler, EventTopic,
    LocalNotification, NotificationSink, StaticCredentials, SubscriptionId,
};
pub use config::ConnectionConfig;
pub use network::{
    ChatMessageEvent, ConnectionManager, ConnectionState, Envelope, MessageKind, MockConnector,
    NetworkError, NetworkMonitor, NetworkPath, Transport,
};
#[cfg(feature = "network-rustls")]
pub use network::WebSocketConnector;
