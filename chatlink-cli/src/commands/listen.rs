// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Listen Command
//!
//! Keeps a connection open and prints every event.

use anyhow::Result;
use chatlink_core::api::{ChatEvent, EventTopic};
use chatlink_core::network::{ConnectionManager, ConnectionState};

use crate::config::CliConfig;
use crate::display;

async fn join_all(manager: &ConnectionManager, conversations: &[String]) {
    for conversation in conversations {
        if let Err(e) = manager.join_conversation(conversation).await {
            display::warning(&format!("Could not join {}: {}", conversation, e));
        }
    }
}

pub async fn run(config: &CliConfig, conversations: &[String]) -> Result<()> {
    let manager = config.manager()?;
    let (_subscription, mut events) = manager.subscribe_channel(&EventTopic::ALL);

    display::info(&format!(
        "Connecting to {}",
        config.connection_config().server_url
    ));
    manager.connect().await?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                display::event(&event);
                // Joins do not survive a reconnect.
                if let ChatEvent::ConnectionStateChanged { state: ConnectionState::Connected } = event {
                    join_all(&manager, conversations).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    manager.disconnect().await?;
    display::success("Disconnected");
    Ok(())
}
