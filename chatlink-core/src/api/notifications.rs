// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local Notifications
//!
//! Hook into the host's notification center for messages the user is not
//! currently looking at.

use crate::network::{ChatMessageEvent, UserId};

const FALLBACK_TITLE: &str = "New message";
const FALLBACK_BODY: &str = "You received a new message";

/// A notification to show on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: UserId,
}

impl LocalNotification {
    /// Builds the notification for an incoming chat message.
    pub fn for_message(message: &ChatMessageEvent) -> Self {
        let title = if message.sender.nickname.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            message.sender.nickname.clone()
        };
        let body = if message.content.is_empty() {
            FALLBACK_BODY.to_string()
        } else {
            message.content.clone()
        };
        LocalNotification {
            title,
            body,
            conversation_id: message.conversation_id.clone(),
            message_id: message.id.clone(),
            sender_id: message.sender_id,
        }
    }
}

/// Host-side notification delivery.
pub trait NotificationSink: Send + Sync {
    /// True while the app is in the foreground.
    fn is_foreground(&self) -> bool;

    /// Conversation currently on screen, if any.
    fn active_conversation(&self) -> Option<String>;

    fn schedule(&self, notification: LocalNotification);

    /// Notify unless the user is looking at this very conversation.
    fn should_notify(&self, conversation_id: &str) -> bool {
        !self.is_foreground() || self.active_conversation().as_deref() != Some(conversation_id)
    }
}

/// Sink for hosts without local notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifications;

impl NotificationSink for NoopNotifications {
    fn is_foreground(&self) -> bool {
        true
    }

    fn active_conversation(&self) -> Option<String> {
        None
    }

    fn schedule(&self, _notification: LocalNotification) {}

    fn should_notify(&self, _conversation_id: &str) -> bool {
        false
    }
}
