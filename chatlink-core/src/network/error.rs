// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use thiserror::Error;

use super::message::MessageKind;

/// Errors raised by the transport and connection layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Missing credential")]
    MissingCredential,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection manager stopped")]
    ManagerStopped,
}

/// Errors raised while turning a wire frame into a typed event.
///
/// These never escalate past the receive loop; the frame is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Missing payload for {0}")]
    MissingPayload(MessageKind),

    #[error("Missing field `{field}` in {kind} payload")]
    MissingField {
        kind: MessageKind,
        field: &'static str,
    },

    #[error("Unparseable {0} payload")]
    Unparseable(MessageKind),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Result type for frame decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;
