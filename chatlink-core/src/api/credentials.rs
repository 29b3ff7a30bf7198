// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Credentials
//!
//! Bearer token and signed-in user, supplied by the host's auth layer.

use std::fmt;

use parking_lot::RwLock;

use crate::network::UserRef;

/// Source of the bearer token and the locally signed-in user.
///
/// Consulted on every connection attempt, so a token refreshed by the host
/// is picked up by the next reconnect.
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, if signed in.
    fn token(&self) -> Option<String>;

    /// The signed-in user, used to resolve our own messages' sender.
    fn current_user(&self) -> Option<UserRef>;

    fn has_token(&self) -> bool {
        self.token().is_some_and(|token| !token.is_empty())
    }
}

/// In-memory credentials that can be swapped at runtime.
#[derive(Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
    user: RwLock<Option<UserRef>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>, user: Option<UserRef>) -> Self {
        StaticCredentials {
            token: RwLock::new(token),
            user: RwLock::new(user),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        StaticCredentials::new(Some(token.into()), None)
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn set_user(&self, user: Option<UserRef>) {
        *self.user.write() = user;
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn current_user(&self) -> Option<UserRef> {
        self.user.read().clone()
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.read().as_ref().map(|_| "<redacted>"))
            .field("user", &*self.user.read())
            .finish()
    }
}
