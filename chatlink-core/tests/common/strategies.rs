// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use chatlink_core::network::{MessageKind, Payload};
use proptest::prelude::*;
use serde_json::Value;

/// Any message kind, known or not.
pub fn message_kind_strategy() -> impl Strategy<Value = MessageKind> {
    prop_oneof![
        4 => prop::sample::select(MessageKind::known().to_vec()),
        1 => "[a-z_]{3,16}".prop_map(|tag| MessageKind::from_wire(&tag)),
    ]
}

/// Scalar JSON values.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,24}".prop_map(Value::String),
    ]
}

/// Small payload objects with scalar or one-level nested values.
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    let value = json_scalar_strategy().prop_recursive(2, 8, 4, |inner| {
        prop::collection::btree_map("[a-zA-Z]{1,8}", inner, 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect()))
    });
    prop::collection::btree_map("[a-zA-Z]{1,12}", value, 0..6)
        .prop_map(|map| map.into_iter().collect())
}

/// Message content, including non-ASCII text.
pub fn content_strategy() -> impl Strategy<Value = String> {
    "\\PC{1,80}"
}

/// Server-style timestamps.
pub fn timestamp_strategy() -> impl Strategy<Value = String> {
    (2020u32..2030, 1u32..13, 1u32..29, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, mo, d, h, mi, s),
    )
}
