// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Display Helpers
//!
//! Styled terminal output.

use chatlink_core::api::ChatEvent;
use chatlink_core::network::{ConnectionState, UpdateType, UserStatus};
use console::style;

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

fn state(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Connected => style(state.to_string()).green().to_string(),
        ConnectionState::Connecting => style(state.to_string()).yellow().to_string(),
        ConnectionState::Disconnected => style(state.to_string()).dim().to_string(),
        ConnectionState::Failed(_) => style(state.to_string()).red().to_string(),
    }
}

/// One line per event.
pub fn event(event: &ChatEvent) {
    let line = match event {
        ChatEvent::ConnectionStateChanged { state: s } => {
            format!("{} {}", style("[state]").bold(), state(s))
        }
        ChatEvent::ConnectionConfirmed(ack) => {
            format!(
                "{} server confirmed user {} ({})",
                style("[session]").bold(),
                ack.user_id,
                ack.status
            )
        }
        ChatEvent::NewMessage(new) => format!(
            "{} {} {}: {}",
            style(format!("[{}]", new.conversation_id)).cyan(),
            style(&new.message.created_at).dim(),
            style(&new.message.sender.nickname).bold(),
            new.message.content
        ),
        ChatEvent::UserStatusChanged(change) => {
            let status = match change.status {
                UserStatus::Online => style("online").green(),
                UserStatus::Away => style("away").yellow(),
                UserStatus::Offline => style("offline").dim(),
            };
            format!("{} user {} is {}", style("[presence]").bold(), change.user_id, status)
        }
        ChatEvent::TypingStatusChanged(typing) => format!(
            "{} user {} {} typing",
            style(format!("[{}]", typing.conversation_id)).cyan(),
            typing.user_id,
            if typing.is_typing { "started" } else { "stopped" }
        ),
        ChatEvent::MessageUpdated(update) => {
            let what = match &update.update_type {
                UpdateType::Recalled => "recalled".to_string(),
                UpdateType::Deleted => "deleted".to_string(),
                UpdateType::Edited => format!(
                    "edited: {}",
                    update.new_content.as_deref().unwrap_or_default()
                ),
                UpdateType::StatusUpdated => format!(
                    "now {}",
                    update
                        .new_status
                        .map_or_else(|| "unknown".to_string(), |s| format!("{:?}", s).to_lowercase())
                ),
                UpdateType::Other(other) => other.clone(),
            };
            format!(
                "{} message {} {}",
                style(format!("[{}]", update.conversation_id)).cyan(),
                update.message_id,
                what
            )
        }
        ChatEvent::ConversationUpdated(update) => format!(
            "{} conversation updated ({:?})",
            style(format!("[{}]", update.conversation_id)).cyan(),
            update.update_type
        ),
        ChatEvent::ConversationUnreadUpdated(update) => format!(
            "{} {} unread",
            style(format!("[{}]", update.conversation_id)).cyan(),
            update.unread_count
        ),
        ChatEvent::ReadReceipt(receipt) | ChatEvent::MessageRead(receipt) => format!(
            "{} user {} read {}",
            style(format!("[{}]", receipt.conversation_id)).cyan(),
            receipt.user_id,
            receipt.message_id
        ),
    };
    println!("{}", line);
}
