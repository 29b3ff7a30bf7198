// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for the connection manager

use std::time::Duration;

use tracing::warn;

pub const ENV_SERVER_URL: &str = "CHATLINK_SERVER_URL";
pub const ENV_HEARTBEAT_SECS: &str = "CHATLINK_HEARTBEAT_SECS";
pub const ENV_LIVENESS_SECS: &str = "CHATLINK_LIVENESS_SECS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "CHATLINK_MAX_RECONNECT_ATTEMPTS";
pub const ENV_RECONNECT_BASE_SECS: &str = "CHATLINK_RECONNECT_BASE_SECS";
pub const ENV_RECONNECT_CAP_SECS: &str = "CHATLINK_RECONNECT_CAP_SECS";
pub const ENV_SETTLE_SECS: &str = "CHATLINK_SETTLE_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "CHATLINK_CONNECT_TIMEOUT_SECS";

/// Connection manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// WebSocket endpoint, without the token query.
    pub server_url: String,

    /// Interval between heartbeat pings while connected.
    pub heartbeat_interval: Duration,

    /// Silence after which a live connection is declared dead.
    pub liveness_timeout: Duration,

    /// Automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Backoff step; attempt `n` waits `n * reconnect_base_delay`.
    pub reconnect_base_delay: Duration,

    /// Upper bound on a single backoff wait.
    pub reconnect_max_delay: Duration,

    /// Wait after the network comes back before reconnecting.
    pub network_settle_delay: Duration,

    /// Handshake timeout for one connection attempt.
    pub connect_timeout: Duration,

    /// How long a closing handshake may take before the socket is dropped.
    pub close_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let heartbeat_interval = Duration::from_secs(30);
        Self {
            server_url: "wss://api.qinghejihua.com.cn/ws".to_string(),
            heartbeat_interval,
            liveness_timeout: heartbeat_interval * 2,
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(30),
            network_settle_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(15),
            close_timeout: Duration::from_secs(2),
        }
    }
}

impl ConnectionConfig {
    /// Defaults overridden by `CHATLINK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// Values that fail to parse are ignored with a warning. If only the
    /// heartbeat is overridden, the liveness timeout follows it.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVER_URL).filter(|url| !url.trim().is_empty()) {
            config.server_url = url.trim().to_string();
        }
        if let Some(heartbeat) = secs(&lookup, ENV_HEARTBEAT_SECS) {
            config.heartbeat_interval = heartbeat;
            config.liveness_timeout = heartbeat * 2;
        }
        if let Some(liveness) = secs(&lookup, ENV_LIVENESS_SECS) {
            config.liveness_timeout = liveness;
        }
        if let Some(attempts) = parsed::<u32, _>(&lookup, ENV_MAX_RECONNECT_ATTEMPTS) {
            config.max_reconnect_attempts = attempts;
        }
        if let Some(base) = secs(&lookup, ENV_RECONNECT_BASE_SECS) {
            config.reconnect_base_delay = base;
        }
        if let Some(cap) = secs(&lookup, ENV_RECONNECT_CAP_SECS) {
            config.reconnect_max_delay = cap;
        }
        if let Some(settle) = secs(&lookup, ENV_SETTLE_SECS) {
            config.network_settle_delay = settle;
        }
        if let Some(timeout) = secs(&lookup, ENV_CONNECT_TIMEOUT_SECS) {
            config.connect_timeout = timeout;
        }

        config
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Sets the heartbeat interval and a liveness timeout of twice that.
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.liveness_timeout = interval * 2;
        self
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

/// Positive whole seconds.
fn secs<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed::<u64, _>(lookup, key)? {
        0 => {
            warn!(key, "Ignoring zero duration");
            None
        }
        n => Some(Duration::from_secs(n)),
    }
}
