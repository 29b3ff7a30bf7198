// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host-Facing API
//!
//! Event subscription plus the collaborators a host injects into a
//! connection manager: credentials and local notifications.

mod credentials;
mod events;
mod notifications;

pub use credentials::{CredentialProvider, StaticCredentials};
pub use events::{
    CallbackHandler, ChannelHandler, ChatEvent, EventDispatcher, EventHandler, EventTopic,
    SubscriptionId,
};
pub use notifications::{LocalNotification, NoopNotifications, NotificationSink};
