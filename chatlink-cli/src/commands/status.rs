// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Status Command

use std::time::Duration;

use anyhow::Result;

use super::connect_and_wait;
use crate::config::CliConfig;
use crate::display;

pub async fn run(config: &CliConfig, wait_secs: u64) -> Result<()> {
    let manager = config.manager()?;

    let result = connect_and_wait(&manager, Duration::from_secs(wait_secs)).await;
    print!("{}", manager.detailed_connection_status());

    match result {
        Ok(()) => {
            display::success("Connection is healthy");
            manager.disconnect().await?;
            Ok(())
        }
        Err(e) => {
            display::error("Connection check failed");
            manager.shutdown().await?;
            Err(e)
        }
    }
}
