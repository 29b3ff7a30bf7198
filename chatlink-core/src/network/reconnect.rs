// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconnect Policy
//!
//! Decides whether and when to retry after a connection failure.

use std::time::Duration;

use crate::config::ConnectionConfig;

/// Linear, capped backoff with a bounded number of attempts.
///
/// The attempt counter itself lives with the connection driver; the policy
/// is a pure function of it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chatlink_core::network::ReconnectPolicy;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.delay_for(1), Duration::from_secs(5));
/// assert_eq!(policy.delay_for(10), Duration::from_secs(30));
/// assert!(!policy.should_retry(5, true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        ReconnectPolicy {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Builds the policy from the reconnect fields of a config.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        ReconnectPolicy::new(
            config.max_reconnect_attempts,
            config.reconnect_base_delay,
            config.reconnect_max_delay,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if another automatic attempt is allowed after `attempt`
    /// failures.
    pub fn should_retry(&self, attempt: u32, has_credential: bool) -> bool {
        has_credential && attempt < self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(attempt)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
