// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Ping Command

use std::time::Duration;

use anyhow::Result;

use super::connect_and_wait;
use crate::config::CliConfig;
use crate::display;

pub async fn run(config: &CliConfig) -> Result<()> {
    let manager = config.manager()?;
    connect_and_wait(&manager, Duration::from_secs(10)).await?;

    manager.send_heartbeat().await?;
    display::success("Heartbeat sent");

    manager.disconnect().await?;
    Ok(())
}
