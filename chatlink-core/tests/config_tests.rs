//! Tests for config

use std::collections::HashMap;
use std::time::Duration;

use chatlink_core::config::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = ConnectionConfig::default();
    assert_eq!(config.server_url, "wss://api.qinghejihua.com.cn/ws");
    assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    assert_eq!(config.liveness_timeout, Duration::from_secs(60));
    assert_eq!(config.max_reconnect_attempts, 5);
    assert_eq!(config.reconnect_base_delay, Duration::from_secs(5));
    assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
    assert_eq!(config.network_settle_delay, Duration::from_secs(2));
    assert_eq!(config.connect_timeout, Duration::from_secs(15));
}

#[test]
fn test_empty_lookup_gives_defaults() {
    assert_eq!(
        ConnectionConfig::from_lookup(|_| None),
        ConnectionConfig::default()
    );
}

#[test]
fn test_overrides() {
    let config = ConnectionConfig::from_lookup(lookup(&[
        (ENV_SERVER_URL, " ws://localhost:9000/ws "),
        (ENV_MAX_RECONNECT_ATTEMPTS, "8"),
        (ENV_RECONNECT_BASE_SECS, "2"),
        (ENV_RECONNECT_CAP_SECS, "20"),
        (ENV_SETTLE_SECS, "1"),
        (ENV_CONNECT_TIMEOUT_SECS, "5"),
    ]));

    assert_eq!(config.server_url, "ws://localhost:9000/ws");
    assert_eq!(config.max_reconnect_attempts, 8);
    assert_eq!(config.reconnect_base_delay, Duration::from_secs(2));
    assert_eq!(config.reconnect_max_delay, Duration::from_secs(20));
    assert_eq!(config.network_settle_delay, Duration::from_secs(1));
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
}

#[test]
fn test_heartbeat_override_moves_liveness() {
    let config = ConnectionConfig::from_lookup(lookup(&[(ENV_HEARTBEAT_SECS, "10")]));
    assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    assert_eq!(config.liveness_timeout, Duration::from_secs(20));

    let config = ConnectionConfig::from_lookup(lookup(&[
        (ENV_HEARTBEAT_SECS, "10"),
        (ENV_LIVENESS_SECS, "45"),
    ]));
    assert_eq!(config.liveness_timeout, Duration::from_secs(45));
}

#[test]
fn test_invalid_values_are_ignored() {
    let config = ConnectionConfig::from_lookup(lookup(&[
        (ENV_HEARTBEAT_SECS, "soon"),
        (ENV_MAX_RECONNECT_ATTEMPTS, "-1"),
        (ENV_SETTLE_SECS, "0"),
        (ENV_SERVER_URL, "   "),
    ]));
    assert_eq!(config, ConnectionConfig::default());
}

#[test]
fn test_builders() {
    let config = ConnectionConfig::default()
        .with_server_url("ws://127.0.0.1:8080/ws")
        .with_heartbeat(Duration::from_secs(5));

    assert_eq!(config.server_url, "ws://127.0.0.1:8080/ws");
    assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
    assert_eq!(config.liveness_timeout, Duration::from_secs(10));
}
