// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Fixtures
//!
//! A connection manager wired to in-memory collaborators, plus canned
//! server payloads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chatlink_core::api::{LocalNotification, NotificationSink, StaticCredentials};
use chatlink_core::network::{
    ConnectionManager, ConnectionState, MockConnector, MockServer, NetworkMonitor, NetworkPath,
    UserRef,
};
use chatlink_core::ConnectionConfig;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;

pub const TEST_TOKEN: &str = "secret-token";
pub const MY_ID: i64 = 7;

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::default().with_server_url("wss://chat.test/ws")
}

pub fn me() -> UserRef {
    UserRef::new(MY_ID, "Me")
}

/// Notification sink that records what it was asked to show.
#[derive(Default)]
pub struct RecordingNotifications {
    foreground: AtomicBool,
    active: Mutex<Option<String>>,
    scheduled: Mutex<Vec<LocalNotification>>,
}

impl RecordingNotifications {
    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::SeqCst);
    }

    pub fn set_active_conversation(&self, conversation_id: Option<&str>) {
        *self.active.lock() = conversation_id.map(str::to_string);
    }

    pub fn scheduled(&self) -> Vec<LocalNotification> {
        self.scheduled.lock().clone()
    }
}

impl NotificationSink for RecordingNotifications {
    fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }

    fn active_conversation(&self) -> Option<String> {
        self.active.lock().clone()
    }

    fn schedule(&self, notification: LocalNotification) {
        self.scheduled.lock().push(notification);
    }
}

/// A manager plus handles on every collaborator.
pub struct Harness {
    pub manager: ConnectionManager,
    pub connector: MockConnector,
    pub credentials: Arc<StaticCredentials>,
    pub monitor: NetworkMonitor,
    pub notifications: Arc<RecordingNotifications>,
    pub states: watch::Receiver<ConnectionState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let connector = MockConnector::new();
        let credentials = Arc::new(StaticCredentials::new(
            Some(TEST_TOKEN.to_string()),
            Some(me()),
        ));
        let monitor = NetworkMonitor::new(NetworkPath::default());
        let notifications = Arc::new(RecordingNotifications::default());
        notifications.set_foreground(true);

        let manager = ConnectionManager::builder(config)
            .connector(Arc::new(connector.clone()))
            .credentials(credentials.clone())
            .network_monitor(monitor.clone())
            .notifications(notifications.clone())
            .build();
        let states = manager.state_receiver();

        Harness {
            manager,
            connector,
            credentials,
            monitor,
            notifications,
            states,
        }
    }

    /// Connects and returns the server end of the new socket.
    pub async fn connected(&mut self) -> MockServer {
        let index = self.connector.server_count();
        self.manager.connect().await.unwrap();
        let server = self.connector.wait_for_server(index).await;
        self.wait_for_state(ConnectionState::Connected).await;
        server
    }

    pub async fn wait_for_state(&mut self, expected: ConnectionState) {
        self.states
            .wait_for(|state| *state == expected)
            .await
            .expect("manager stopped");
    }

    pub async fn wait_until<F>(&mut self, predicate: F) -> ConnectionState
    where
        F: Fn(&ConnectionState) -> bool,
    {
        let state = self
            .states
            .wait_for(|state| predicate(state))
            .await
            .expect("manager stopped");
        state.clone()
    }
}

pub fn user_json(id: i64, nickname: &str) -> Value {
    json!({
        "id": id,
        "nickname": nickname,
        "avatar": null,
        "isVerified": false,
        "isOnline": true
    })
}

/// `newMessage` payload in the nested shape.
pub fn nested_new_message(conversation_id: &str, id: &str, sender_id: i64, content: &str) -> Value {
    json!({
        "type": "newMessage",
        "data": {
            "conversationId": conversation_id,
            "message": {
                "id": id,
                "conversationId": conversation_id,
                "senderId": sender_id,
                "content": content,
                "type": "text",
                "status": "delivered",
                "isRecalled": false,
                "createdAt": "2025-08-23 22:09:24",
                "sender": user_json(sender_id, "Alice")
            }
        }
    })
}

/// The same message in the flat shape.
pub fn flat_new_message(conversation_id: &str, id: &str, sender_id: i64, content: &str) -> Value {
    json!({
        "type": "newMessage",
        "data": {
            "conversationId": conversation_id,
            "id": id,
            "senderId": sender_id,
            "content": content,
            "type": "text",
            "status": "delivered",
            "isRecalled": false,
            "createdAt": "2025-08-23 22:09:24",
            "sender": user_json(sender_id, "Alice")
        }
    })
}

pub fn typing_json(conversation_id: &str, user_id: i64, is_typing: bool) -> Value {
    json!({
        "type": "typing",
        "data": {"conversationId": conversation_id, "userId": user_id, "isTyping": is_typing}
    })
}

pub fn user_status_json(user_id: i64, status: &str) -> Value {
    json!({
        "type": "user_status",
        "data": {"userId": user_id, "status": status}
    })
}
