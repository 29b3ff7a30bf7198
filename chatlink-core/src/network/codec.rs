// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Codec
//!
//! Encodes outgoing envelopes and turns incoming frames into [`InboundEvent`]s.
//!
//! Decoding happens in two steps: the frame is parsed into a generic
//! [`Envelope`] (tag + raw payload), then a single dispatch on the tag
//! extracts the kind-specific payload.
//!
//! # Message shapes
//!
//! Servers have shipped two layouts for `newMessage`-class payloads:
//!
//! ```text
//! nested: { "conversationId": "c1", "message": { "id": "m1", "senderId": 3, ... } }
//! flat:   { "conversationId": "c1", "id": "m1", "senderId": 3, ... }
//! ```
//!
//! Both are accepted. Extraction runs an ordered list of strategies and keeps
//! the first one that yields a message: strict structured decoding of each
//! shape, then lenient field-by-field reads of each shape. This is a
//! compatibility shim for older servers and must stay until they are retired.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{DecodeError, DecodeResult, NetworkError};
use super::message::{
    ChatMessageEvent, ConversationUnreadUpdate, ConversationUpdate, ConversationUpdateType,
    Envelope, InboundEvent, MessageKind, MessageStatus, MessageType, MessageUpdate, NewMessage,
    Payload, UpdateType, UserId, UserRef,
};

/// Context needed to resolve fields the server may leave out.
#[derive(Debug, Clone, Default)]
pub struct DecodeContext {
    /// The authenticated user of this client, if known.
    pub local_user: Option<UserRef>,
}

impl DecodeContext {
    pub fn new(local_user: Option<UserRef>) -> Self {
        DecodeContext { local_user }
    }
}

/// Encodes an envelope to JSON bytes.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, NetworkError> {
    serde_json::to_vec(envelope).map_err(|e| NetworkError::Serialization(e.to_string()))
}

/// Parses JSON bytes into a generic envelope.
pub fn decode_envelope(bytes: &[u8]) -> DecodeResult<Envelope> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Parses JSON bytes and extracts the typed event in one go.
pub fn decode_event_bytes(bytes: &[u8], ctx: &DecodeContext) -> DecodeResult<InboundEvent> {
    decode_event(decode_envelope(bytes)?, ctx)
}

/// Extracts the typed payload of an envelope.
pub fn decode_event(envelope: Envelope, ctx: &DecodeContext) -> DecodeResult<InboundEvent> {
    match envelope.kind {
        MessageKind::Ping => return Ok(InboundEvent::Ping),
        MessageKind::Pong => return Ok(InboundEvent::Pong),
        _ => {}
    }
    if matches!(
        envelope.kind,
        MessageKind::Unknown(_) | MessageKind::JoinConversation | MessageKind::LeaveConversation
    ) {
        return Ok(InboundEvent::Unhandled(envelope));
    }

    let kind = envelope.kind.clone();
    let data = envelope
        .data
        .as_ref()
        .ok_or_else(|| DecodeError::MissingPayload(kind.clone()))?;

    let event = match &kind {
        MessageKind::ConnectionAck => InboundEvent::ConnectionAck(typed_payload(&kind, data)?),
        MessageKind::NewMessage => InboundEvent::NewMessage(extract_new_message(data, ctx)?),
        MessageKind::UserStatus => InboundEvent::UserStatus(typed_payload(&kind, data)?),
        MessageKind::Typing => InboundEvent::Typing(typed_payload(&kind, data)?),
        MessageKind::MessageUpdated => {
            InboundEvent::MessageUpdated(extract_message_update(data, ctx)?)
        }
        MessageKind::ConversationUpdated => {
            InboundEvent::ConversationUpdated(extract_conversation_update(data)?)
        }
        MessageKind::ConversationUnreadUpdated => {
            InboundEvent::ConversationUnreadUpdated(extract_unread_update(data, ctx)?)
        }
        MessageKind::ReadReceipt => InboundEvent::ReadReceipt(typed_payload(&kind, data)?),
        MessageKind::MessageRead => InboundEvent::MessageRead(typed_payload(&kind, data)?),
        // Returned early above.
        MessageKind::Ping
        | MessageKind::Pong
        | MessageKind::JoinConversation
        | MessageKind::LeaveConversation
        | MessageKind::Unknown(_) => {
            InboundEvent::Unhandled(Envelope::new(kind.clone(), Some(data.clone())))
        }
    };
    Ok(event)
}

fn typed_payload<T: DeserializeOwned>(kind: &MessageKind, data: &Payload) -> DecodeResult<T> {
    serde_json::from_value(Value::Object(data.clone()))
        .map_err(|e| DecodeError::Malformed(format!("{} payload: {}", kind, e)))
}

// === Chat message extraction ===

/// Fields of a chat message before defaults and sender resolution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: String,
    sender_id: UserId,
    content: String,
    created_at: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    is_recalled: Option<bool>,
    #[serde(default)]
    sender: Option<RawSender>,
    #[serde(default)]
    reply_to_message_id: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default)]
    media_duration: Option<i64>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// The sender is either a full user object or, on legacy servers, a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSender {
    User(UserRef),
    Name(String),
}

/// Values used when the payload omits them.
#[derive(Debug, Clone, Copy)]
struct MessageDefaults {
    status: MessageStatus,
}

const NEW_MESSAGE_DEFAULTS: MessageDefaults = MessageDefaults {
    status: MessageStatus::Delivered,
};

const LAST_MESSAGE_DEFAULTS: MessageDefaults = MessageDefaults {
    status: MessageStatus::Sent,
};

type StrategyFn = fn(&Payload) -> Option<RawMessage>;

/// Ordered decode strategies; the first success wins.
const MESSAGE_STRATEGIES: &[(&str, StrategyFn)] = &[
    ("nested-structured", nested_structured),
    ("flat-structured", flat_structured),
    ("nested-fieldwise", nested_fieldwise),
    ("flat-fieldwise", flat_fieldwise),
];

fn nested_object(data: &Payload) -> Option<&Payload> {
    data.get("message").and_then(Value::as_object)
}

fn nested_structured(data: &Payload) -> Option<RawMessage> {
    let message = nested_object(data)?;
    serde_json::from_value(Value::Object(message.clone()))
        .map_err(|e| debug!("Nested message structured decode failed: {}", e))
        .ok()
}

fn flat_structured(data: &Payload) -> Option<RawMessage> {
    if !data.contains_key("id") {
        return None;
    }
    serde_json::from_value(Value::Object(data.clone()))
        .map_err(|e| debug!("Flat message structured decode failed: {}", e))
        .ok()
}

fn nested_fieldwise(data: &Payload) -> Option<RawMessage> {
    nested_object(data).and_then(fieldwise)
}

fn flat_fieldwise(data: &Payload) -> Option<RawMessage> {
    fieldwise(data)
}

/// Reads each field independently, ignoring optional ones of the wrong type.
fn fieldwise(data: &Payload) -> Option<RawMessage> {
    let sender_id = int_field(data, "senderId")?;
    Some(RawMessage {
        id: str_field(data, "id")?.to_string(),
        sender_id,
        content: str_field(data, "content")?.to_string(),
        created_at: str_field(data, "createdAt")?.to_string(),
        kind: str_field(data, "type").map(str::to_string),
        status: str_field(data, "status").map(str::to_string),
        is_recalled: data.get("isRecalled").and_then(Value::as_bool),
        sender: match data.get("sender") {
            Some(Value::Object(user)) => user_from_object(user, sender_id).map(RawSender::User),
            Some(Value::String(name)) => Some(RawSender::Name(name.clone())),
            _ => None,
        },
        reply_to_message_id: str_field(data, "replyToMessageId").map(str::to_string),
        media_url: str_field(data, "mediaUrl").map(str::to_string),
        media_duration: int_field(data, "mediaDuration"),
        thumbnail_url: str_field(data, "thumbnailUrl").map(str::to_string),
    })
}

fn user_from_object(user: &Payload, id: UserId) -> Option<UserRef> {
    Some(UserRef {
        id,
        nickname: str_field(user, "nickname")?.to_string(),
        avatar: str_field(user, "avatar").map(str::to_string),
        is_verified: bool_like(user.get("isVerified")),
        is_online: bool_like(user.get("isOnline")),
        last_seen_at: str_field(user, "lastSeenAt").map(str::to_string),
    })
}

fn bool_like(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        _ => false,
    }
}

fn str_field<'a>(data: &'a Payload, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

fn int_field(data: &Payload, key: &str) -> Option<i64> {
    data.get(key).and_then(Value::as_i64)
}

fn require_str(data: &Payload, kind: MessageKind, field: &'static str) -> DecodeResult<String> {
    str_field(data, field)
        .map(str::to_string)
        .ok_or(DecodeError::MissingField { kind, field })
}

/// Resolves the sender: embedded user, legacy display name, the local user,
/// then a `user{id}` placeholder.
fn resolve_sender(sender: Option<RawSender>, sender_id: UserId, ctx: &DecodeContext) -> UserRef {
    match sender {
        Some(RawSender::User(mut user)) => {
            user.id = sender_id;
            user
        }
        Some(RawSender::Name(name)) if !name.is_empty() => UserRef::new(sender_id, name),
        _ => match &ctx.local_user {
            Some(me) if me.id == sender_id => UserRef {
                is_online: true,
                ..me.clone()
            },
            _ => {
                debug!(sender_id, "No sender details in payload, using placeholder");
                UserRef::placeholder(sender_id)
            }
        },
    }
}

fn finish_message(
    raw: RawMessage,
    conversation_id: &str,
    defaults: MessageDefaults,
    ctx: &DecodeContext,
) -> ChatMessageEvent {
    let sender = resolve_sender(raw.sender, raw.sender_id, ctx);
    ChatMessageEvent {
        id: raw.id,
        conversation_id: conversation_id.to_string(),
        sender_id: raw.sender_id,
        content: raw.content,
        kind: raw.kind.as_deref().map(MessageType::from_wire).unwrap_or_default(),
        status: raw
            .status
            .as_deref()
            .and_then(MessageStatus::from_wire)
            .unwrap_or(defaults.status),
        is_recalled: raw.is_recalled.unwrap_or(false),
        created_at: raw.created_at,
        sender,
        // An empty reply id means "not a reply".
        reply_to_message_id: raw.reply_to_message_id.filter(|id| !id.is_empty()),
        media_url: raw.media_url,
        media_duration: raw.media_duration,
        thumbnail_url: raw.thumbnail_url,
    }
}

/// Runs the decode strategies in order over a payload of either shape.
fn extract_chat_message(
    data: &Payload,
    conversation_id: &str,
    defaults: MessageDefaults,
    ctx: &DecodeContext,
) -> Option<ChatMessageEvent> {
    MESSAGE_STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(data).map(|raw| {
            debug!(strategy = *name, message_id = %raw.id, "Decoded chat message");
            finish_message(raw, conversation_id, defaults, ctx)
        })
    })
}

fn conversation_id_of(data: &Payload) -> Option<&str> {
    str_field(data, "conversationId")
        .or_else(|| nested_object(data).and_then(|m| str_field(m, "conversationId")))
}

fn extract_new_message(data: &Payload, ctx: &DecodeContext) -> DecodeResult<NewMessage> {
    let conversation_id = conversation_id_of(data).ok_or(DecodeError::MissingField {
        kind: MessageKind::NewMessage,
        field: "conversationId",
    })?;

    match extract_chat_message(data, conversation_id, NEW_MESSAGE_DEFAULTS, ctx) {
        Some(message) => Ok(NewMessage {
            conversation_id: conversation_id.to_string(),
            message,
        }),
        None => {
            warn!(
                conversation_id,
                "newMessage payload is missing id, senderId, content or createdAt"
            );
            Err(DecodeError::Unparseable(MessageKind::NewMessage))
        }
    }
}

fn extract_message_update(data: &Payload, ctx: &DecodeContext) -> DecodeResult<MessageUpdate> {
    let kind = MessageKind::MessageUpdated;
    let conversation_id = require_str(data, kind.clone(), "conversationId")?;
    let update_type = require_str(data, kind.clone(), "updateType")?;

    let message = if data.contains_key("message") || data.contains_key("id") {
        extract_chat_message(data, &conversation_id, NEW_MESSAGE_DEFAULTS, ctx)
    } else {
        None
    };

    let message_id = match (str_field(data, "messageId"), &message) {
        (Some(id), _) => id.to_string(),
        (None, Some(message)) => message.id.clone(),
        (None, None) => {
            return Err(DecodeError::MissingField {
                kind,
                field: "messageId",
            })
        }
    };

    let new_status = match str_field(data, "newStatus") {
        Some(status) => {
            let parsed = MessageStatus::from_wire(status);
            if parsed.is_none() {
                warn!(status, "Ignoring unknown message status in update");
            }
            parsed
        }
        None => None,
    };

    Ok(MessageUpdate {
        message_id,
        conversation_id,
        update_type: UpdateType::from_wire(&update_type),
        new_content: str_field(data, "newContent").map(str::to_string),
        new_status,
        message,
    })
}

fn extract_conversation_update(data: &Payload) -> DecodeResult<ConversationUpdate> {
    let kind = MessageKind::ConversationUpdated;
    let conversation_id = require_str(data, kind.clone(), "conversationId")?;
    let update_type = require_str(data, kind, "updateType")?;

    let attributes: BTreeMap<String, String> = data
        .get("data")
        .and_then(Value::as_object)
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(ConversationUpdate {
        conversation_id,
        update_type: ConversationUpdateType::from_wire(&update_type),
        data: attributes,
    })
}

fn extract_unread_update(
    data: &Payload,
    ctx: &DecodeContext,
) -> DecodeResult<ConversationUnreadUpdate> {
    let kind = MessageKind::ConversationUnreadUpdated;
    let conversation_id = require_str(data, kind.clone(), "conversationId")?;
    let unread_count = data
        .get("unreadCount")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(DecodeError::MissingField {
            kind: kind.clone(),
            field: "unreadCount",
        })?;
    let last_message_at = require_str(data, kind, "lastMessageAt")?;

    let last_message = data
        .get("lastMessage")
        .and_then(Value::as_object)
        .and_then(fieldwise)
        .map(|raw| finish_message(raw, &conversation_id, LAST_MESSAGE_DEFAULTS, ctx));

    Ok(ConversationUnreadUpdate {
        conversation_id,
        unread_count,
        last_message,
        last_message_at,
    })
}

// INLINE_TEST_REQUIRED: Tests private strategy ordering and sender resolution
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_strategy_order_prefers_nested_structured() {
        let data = payload(json!({
            "conversationId": "c1",
            "message": {
                "id": "m1", "senderId": 1, "content": "hi", "createdAt": "2025-08-23 22:09:24",
                "sender": {"id": 1, "nickname": "Ann"}
            }
        }));
        let first = MESSAGE_STRATEGIES
            .iter()
            .find(|(_, strategy)| strategy(&data).is_some())
            .map(|(name, _)| *name);
        assert_eq!(first, Some("nested-structured"));
    }

    #[test]
    fn test_wrong_typed_optional_field_falls_back_to_fieldwise() {
        // isRecalled as an integer breaks structured decoding
        let data = payload(json!({
            "conversationId": "c1",
            "id": "m1", "senderId": 1, "content": "hi", "createdAt": "t",
            "isRecalled": 0
        }));
        assert!(flat_structured(&data).is_none());
        assert!(flat_fieldwise(&data).is_some());
    }

    #[test]
    fn test_resolve_sender_empty_name_uses_placeholder() {
        let ctx = DecodeContext::default();
        let user = resolve_sender(Some(RawSender::Name(String::new())), 9, &ctx);
        assert_eq!(user.nickname, "user9");
    }

    #[test]
    fn test_resolve_sender_local_user() {
        let ctx = DecodeContext::new(Some(UserRef::new(4, "Me")));
        let user = resolve_sender(None, 4, &ctx);
        assert_eq!(user.nickname, "Me");
        assert!(user.is_online);

        let other = resolve_sender(None, 5, &ctx);
        assert_eq!(other.nickname, "user5");
    }

    #[test]
    fn test_embedded_user_takes_sender_id() {
        let ctx = DecodeContext::default();
        let user = resolve_sender(Some(RawSender::User(UserRef::new(99, "Bob"))), 2, &ctx);
        assert_eq!(user.id, 2);
        assert_eq!(user.nickname, "Bob");
    }
}
