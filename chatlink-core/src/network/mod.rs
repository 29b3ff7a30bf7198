// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Transport Layer
//!
//! Keeps a persistent connection to the chat server and turns its frames
//! into typed events.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **Transport trait**: Platform-agnostic interface for one socket
//! - **Message types**: Wire envelope and typed payloads
//! - **Codec**: Envelope encoding and tolerant payload extraction
//! - **Heartbeat / reconnect policy**: Liveness and backoff bookkeeping
//! - **Reachability**: OS network-path transitions
//! - **Connection manager**: The state machine tying it all together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatlink_core::network::{ConnectionManager, MockConnector};
//! use chatlink_core::api::StaticCredentials;
//! use chatlink_core::ConnectionConfig;
//!
//! // Mock connector for testing
//! let connector = MockConnector::new();
//! let manager = ConnectionManager::new(
//!     ConnectionConfig::default(),
//!     Arc::new(connector.clone()),
//!     Arc::new(StaticCredentials::with_token("secret")),
//! );
//!
//! manager.connect().await?;
//! let server = connector.wait_for_server(0).await;
//! server.push_envelope(&Envelope::pong());
//! ```

mod codec;
mod connection;
mod error;
mod heartbeat;
mod message;
mod mock;
mod reachability;
mod reconnect;
mod transport;
#[cfg(feature = "network-rustls")]
mod websocket;

// Error types
pub use error::{DecodeError, DecodeResult, NetworkError};

// Message types
pub use message::{
    ChatMessageEvent, ConnectionAck, ConversationUnreadUpdate, ConversationUpdate,
    ConversationUpdateType, Envelope, InboundEvent, MessageKind, MessageStatus, MessageType,
    MessageUpdate, NewMessage, Payload, ReadReceipt, TypingStatus, UpdateType, UserId, UserRef,
    UserStatus, UserStatusChange,
};

// Codec
pub use codec::{decode_envelope, decode_event, decode_event_bytes, encode_envelope, DecodeContext};

// Transport abstraction
pub use transport::{
    connection_url, redact_url, CloseCode, ConnectionState, Connector, Frame, Transport,
    TransportResult, TransportState,
};

// Mock transport for testing
pub use mock::{MockConnector, MockServer, MockTransport, OpenOutcome};

// WebSocket transport for production
#[cfg(feature = "network-rustls")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

// Liveness, backoff and reachability
pub use heartbeat::HeartbeatScheduler;
pub use reachability::{InterfaceKind, NetworkMonitor, NetworkPath, PathStatus};
pub use reconnect::ReconnectPolicy;

// Connection management
pub use connection::{ConnectionManager, ConnectionManagerBuilder};
