// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Configuration

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chatlink_core::api::StaticCredentials;
use chatlink_core::network::{ConnectionManager, UserRef};
use chatlink_core::ConnectionConfig;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Server URL override.
    pub server_url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Signed-in user id.
    pub user_id: Option<i64>,
    /// Heartbeat interval override.
    pub heartbeat_secs: Option<u64>,
}

impl CliConfig {
    /// Environment config with command-line overrides applied.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::from_env();
        if let Some(url) = &self.server_url {
            config = config.with_server_url(url.clone());
        }
        if let Some(secs) = self.heartbeat_secs.filter(|secs| *secs > 0) {
            config = config.with_heartbeat(Duration::from_secs(secs));
        }
        config
    }

    pub fn credentials(&self) -> Result<StaticCredentials> {
        let Some(token) = self.token.clone().filter(|token| !token.is_empty()) else {
            bail!("No token given. Pass --token or set CHATLINK_TOKEN.");
        };
        let user = self
            .user_id
            .map(|id| UserRef::new(id, format!("user{}", id)));
        Ok(StaticCredentials::new(Some(token), user))
    }

    /// Builds a manager over the real WebSocket transport.
    pub fn manager(&self) -> Result<ConnectionManager> {
        let credentials = self.credentials()?;
        Ok(ConnectionManager::builder(self.connection_config())
            .credentials(Arc::new(credentials))
            .build())
    }
}
