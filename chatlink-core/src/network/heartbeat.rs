// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Heartbeat Scheduler
//!
//! Tracks when the next ping is due and when the connection counts as
//! silent. The scheduler only computes deadlines; the connection driver
//! sleeps on them.

use std::time::Duration;

use tokio::time::Instant;

/// Ping/liveness bookkeeping for one live connection.
#[derive(Debug, Clone)]
pub struct HeartbeatScheduler {
    interval: Duration,
    liveness_timeout: Duration,
    next_ping: Option<Instant>,
    last_seen: Option<Instant>,
}

impl HeartbeatScheduler {
    pub fn new(interval: Duration, liveness_timeout: Duration) -> Self {
        HeartbeatScheduler {
            interval,
            liveness_timeout,
            next_ping: None,
            last_seen: None,
        }
    }

    /// Starts the schedule. The connection counts as freshly seen.
    pub fn start(&mut self, now: Instant) {
        self.next_ping = Some(now + self.interval);
        self.last_seen = Some(now);
    }

    /// Clears every deadline.
    pub fn stop(&mut self) {
        self.next_ping = None;
        self.last_seen = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_ping.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next ping is due, if running.
    pub fn next_ping(&self) -> Option<Instant> {
        self.next_ping
    }

    pub fn on_ping_sent(&mut self, now: Instant) {
        if self.is_running() {
            self.next_ping = Some(now + self.interval);
        }
    }

    /// Any inbound frame (pong or otherwise) proves the peer is alive.
    pub fn record_activity(&mut self, now: Instant) {
        if self.is_running() {
            self.last_seen = Some(now);
        }
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    /// Instant after which the connection is declared silent.
    pub fn liveness_deadline(&self) -> Option<Instant> {
        self.last_seen.map(|seen| seen + self.liveness_timeout)
    }

    pub fn is_silent(&self, now: Instant) -> bool {
        self.liveness_deadline()
            .is_some_and(|deadline| now >= deadline)
    }
}
