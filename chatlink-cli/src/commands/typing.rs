// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typing Command

use std::time::Duration;

use anyhow::Result;

use super::connect_and_wait;
use crate::config::CliConfig;
use crate::display;

const CONNECT_WAIT: Duration = Duration::from_secs(10);

pub async fn run(config: &CliConfig, conversation: &str, is_typing: bool) -> Result<()> {
    if config.user_id.is_none() {
        display::warning("No --user-id given; the notice will carry user 0");
    }

    let manager = config.manager()?;
    connect_and_wait(&manager, CONNECT_WAIT).await?;
    manager.send_typing_status(conversation, is_typing).await?;
    manager.disconnect().await?;

    display::success(&format!(
        "Sent {} to {}",
        if is_typing { "typing" } else { "stopped typing" },
        conversation
    ));
    Ok(())
}
