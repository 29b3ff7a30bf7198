// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Reachability
//!
//! The host platform reports OS-level path changes into a [`NetworkMonitor`];
//! connection managers subscribe to it.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::info;

/// Whether the OS currently has a usable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
}

/// Interface currently carrying traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Wifi,
    Cellular,
    Wired,
    Loopback,
    Other,
}

/// A snapshot of the network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPath {
    pub status: PathStatus,
    pub interface: Option<InterfaceKind>,
}

impl NetworkPath {
    pub fn satisfied(interface: InterfaceKind) -> Self {
        NetworkPath {
            status: PathStatus::Satisfied,
            interface: Some(interface),
        }
    }

    pub fn unsatisfied() -> Self {
        NetworkPath {
            status: PathStatus::Unsatisfied,
            interface: None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == PathStatus::Satisfied
    }
}

impl Default for NetworkPath {
    /// Assume the network is up until told otherwise.
    fn default() -> Self {
        NetworkPath {
            status: PathStatus::Satisfied,
            interface: None,
        }
    }
}

impl fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.interface) {
            (PathStatus::Unsatisfied, _) => f.write_str("unavailable"),
            (PathStatus::Satisfied, Some(interface)) => write!(f, "available ({:?})", interface),
            (PathStatus::Satisfied, None) => f.write_str("available"),
        }
    }
}

/// Transitions buffered per subscriber before the oldest are dropped.
const TRANSITION_CAPACITY: usize = 16;

/// Publishes path transitions to any number of subscribers.
///
/// Reporting the same path twice is not a transition and wakes nobody.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    current: Arc<watch::Sender<NetworkPath>>,
    transitions: broadcast::Sender<NetworkPath>,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        NetworkMonitor::new(NetworkPath::default())
    }
}

impl NetworkMonitor {
    pub fn new(initial: NetworkPath) -> Self {
        let (current, _) = watch::channel(initial);
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        NetworkMonitor {
            current: Arc::new(current),
            transitions,
        }
    }

    /// Records the current path. Returns true if it changed.
    pub fn report(&self, path: NetworkPath) -> bool {
        // Published under the watch lock so both channels agree on order.
        let changed = self.current.send_if_modified(|current| {
            if *current == path {
                return false;
            }
            *current = path;
            let _ = self.transitions.send(path);
            true
        });
        if changed {
            info!(path = %path, "Network path changed");
        }
        changed
    }

    pub fn current(&self) -> NetworkPath {
        *self.current.borrow()
    }

    /// Latest path only; rapid changes collapse into the last one.
    pub fn subscribe(&self) -> watch::Receiver<NetworkPath> {
        self.current.subscribe()
    }

    /// Every transition after this call, in the order reported.
    pub fn transitions(&self) -> broadcast::Receiver<NetworkPath> {
        self.transitions.subscribe()
    }
}
