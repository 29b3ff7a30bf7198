//! Tests for network::heartbeat

use std::time::Duration;

use chatlink_core::network::HeartbeatScheduler;
use tokio::time::Instant;

fn scheduler() -> HeartbeatScheduler {
    HeartbeatScheduler::new(Duration::from_secs(30), Duration::from_secs(60))
}

#[test]
fn test_idle_scheduler_has_no_deadlines() {
    let heartbeat = scheduler();
    assert!(!heartbeat.is_running());
    assert_eq!(heartbeat.next_ping(), None);
    assert_eq!(heartbeat.liveness_deadline(), None);
    assert!(!heartbeat.is_silent(Instant::now()));
}

#[test]
fn test_start_sets_deadlines() {
    let now = Instant::now();
    let mut heartbeat = scheduler();
    heartbeat.start(now);

    assert!(heartbeat.is_running());
    assert_eq!(heartbeat.interval(), Duration::from_secs(30));
    assert_eq!(heartbeat.next_ping(), Some(now + Duration::from_secs(30)));
    assert_eq!(heartbeat.last_seen(), Some(now));
    assert_eq!(
        heartbeat.liveness_deadline(),
        Some(now + Duration::from_secs(60))
    );
}

#[test]
fn test_ping_reschedules_from_send_time() {
    let now = Instant::now();
    let mut heartbeat = scheduler();
    heartbeat.start(now);

    let sent_at = now + Duration::from_secs(31);
    heartbeat.on_ping_sent(sent_at);

    assert_eq!(
        heartbeat.next_ping(),
        Some(sent_at + Duration::from_secs(30))
    );
}

#[test]
fn test_activity_extends_liveness() {
    let now = Instant::now();
    let mut heartbeat = scheduler();
    heartbeat.start(now);

    let later = now + Duration::from_secs(50);
    heartbeat.record_activity(later);

    assert!(!heartbeat.is_silent(now + Duration::from_secs(100)));
    assert!(heartbeat.is_silent(later + Duration::from_secs(60)));
}

#[test]
fn test_silent_after_timeout() {
    let now = Instant::now();
    let mut heartbeat = scheduler();
    heartbeat.start(now);

    assert!(!heartbeat.is_silent(now + Duration::from_secs(59)));
    assert!(heartbeat.is_silent(now + Duration::from_secs(60)));
}

#[test]
fn test_stop_clears_and_ignores_updates() {
    let now = Instant::now();
    let mut heartbeat = scheduler();
    heartbeat.start(now);
    heartbeat.stop();

    heartbeat.on_ping_sent(now);
    heartbeat.record_activity(now);

    assert!(!heartbeat.is_running());
    assert_eq!(heartbeat.next_ping(), None);
    assert_eq!(heartbeat.liveness_deadline(), None);
}
