// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Commands

pub mod listen;
pub mod ping;
pub mod status;
pub mod typing;

use std::time::Duration;

use anyhow::{bail, Result};
use chatlink_core::network::ConnectionManager;

/// Connects and waits until the connection is up or `wait` elapses.
pub async fn connect_and_wait(manager: &ConnectionManager, wait: Duration) -> Result<()> {
    manager.connect().await?;

    let mut states = manager.state_receiver();
    let connected = tokio::time::timeout(wait, states.wait_for(|state| state.is_connected()))
        .await
        .map(|result| result.map(|_| ()));
    match connected {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => bail!("Connection manager stopped"),
        Err(_) => bail!("Not connected after {}s: {}", wait.as_secs(), manager.state()),
    }
}
