// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Message Types
//!
//! Wire envelope and the strongly-typed payloads carried inside it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::NetworkError;

/// Kind-specific payload as it appears on the wire.
pub type Payload = serde_json::Map<String, Value>;

/// User identifiers are the server's numeric account ids.
pub type UserId = i64;

/// Tag identifying what an [`Envelope`] carries.
///
/// Unknown tags are preserved rather than rejected so newer servers can
/// introduce events without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Ping,
    Pong,
    /// Server confirmation that the session is established.
    ConnectionAck,
    JoinConversation,
    LeaveConversation,
    Typing,
    NewMessage,
    UserStatus,
    MessageUpdated,
    ConversationUpdated,
    ConversationUnreadUpdated,
    ReadReceipt,
    MessageRead,
    /// Any tag this client does not know about.
    Unknown(String),
}

impl MessageKind {
    /// All tags with a fixed wire name.
    pub fn known() -> [MessageKind; 13] {
        [
            MessageKind::Ping,
            MessageKind::Pong,
            MessageKind::ConnectionAck,
            MessageKind::JoinConversation,
            MessageKind::LeaveConversation,
            MessageKind::Typing,
            MessageKind::NewMessage,
            MessageKind::UserStatus,
            MessageKind::MessageUpdated,
            MessageKind::ConversationUpdated,
            MessageKind::ConversationUnreadUpdated,
            MessageKind::ReadReceipt,
            MessageKind::MessageRead,
        ]
    }

    /// Returns the wire name of this tag.
    ///
    /// The server mixes snake_case and camelCase names; these are reproduced
    /// exactly.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::ConnectionAck => "connection",
            MessageKind::JoinConversation => "join_conversation",
            MessageKind::LeaveConversation => "leave_conversation",
            MessageKind::Typing => "typing",
            MessageKind::NewMessage => "newMessage",
            MessageKind::UserStatus => "user_status",
            MessageKind::MessageUpdated => "message_updated",
            MessageKind::ConversationUpdated => "conversation_updated",
            MessageKind::ConversationUnreadUpdated => "conversationUnreadUpdated",
            MessageKind::ReadReceipt => "read_receipt",
            MessageKind::MessageRead => "message_read",
            MessageKind::Unknown(tag) => tag,
        }
    }

    /// Parses a wire name. Never fails.
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "ping" => MessageKind::Ping,
            "pong" => MessageKind::Pong,
            "connection" => MessageKind::ConnectionAck,
            "join_conversation" => MessageKind::JoinConversation,
            "leave_conversation" => MessageKind::LeaveConversation,
            "typing" => MessageKind::Typing,
            "newMessage" => MessageKind::NewMessage,
            "user_status" => MessageKind::UserStatus,
            "message_updated" => MessageKind::MessageUpdated,
            "conversation_updated" => MessageKind::ConversationUpdated,
            "conversationUnreadUpdated" => MessageKind::ConversationUnreadUpdated,
            "read_receipt" => MessageKind::ReadReceipt,
            "message_read" => MessageKind::MessageRead,
            other => MessageKind::Unknown(other.to_string()),
        }
    }

    /// Returns true if envelopes of this kind must carry a `data` object.
    pub fn requires_payload(&self) -> bool {
        !matches!(self, MessageKind::Ping | MessageKind::Pong)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        MessageKind::from_wire(&tag)
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

/// Wire-level unit, symmetric for send and receive.
///
/// Serialized as `{"type": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl Envelope {
    /// Creates an envelope from a kind and an optional raw payload.
    pub fn new(kind: MessageKind, data: Option<Payload>) -> Self {
        Envelope { kind, data }
    }

    /// Creates an envelope whose payload is the serialized form of `value`.
    ///
    /// Fails if `value` does not serialize to a JSON object.
    pub fn with_payload<T: Serialize>(kind: MessageKind, value: &T) -> Result<Self, NetworkError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(Envelope::new(kind, Some(map))),
            Ok(other) => Err(NetworkError::Serialization(format!(
                "{} payload must be an object, got {}",
                kind,
                json_type_name(&other)
            ))),
            Err(e) => Err(NetworkError::Serialization(e.to_string())),
        }
    }

    /// Heartbeat ping.
    pub fn ping() -> Self {
        Envelope::new(MessageKind::Ping, None)
    }

    /// Heartbeat reply.
    pub fn pong() -> Self {
        Envelope::new(MessageKind::Pong, None)
    }

    /// Subscribes this session to a conversation's events.
    pub fn join_conversation(conversation_id: &str) -> Self {
        Envelope::new(
            MessageKind::JoinConversation,
            Some(conversation_payload(conversation_id)),
        )
    }

    /// Unsubscribes this session from a conversation's events.
    pub fn leave_conversation(conversation_id: &str) -> Self {
        Envelope::new(
            MessageKind::LeaveConversation,
            Some(conversation_payload(conversation_id)),
        )
    }

    /// Announces that `user_id` started or stopped typing.
    pub fn typing(status: &TypingStatus) -> Self {
        let mut data = conversation_payload(&status.conversation_id);
        data.insert("userId".into(), Value::from(status.user_id));
        data.insert("isTyping".into(), Value::Bool(status.is_typing));
        Envelope::new(MessageKind::Typing, Some(data))
    }
}

fn conversation_payload(conversation_id: &str) -> Payload {
    let mut data = Payload::new();
    data.insert(
        "conversationId".into(),
        Value::String(conversation_id.to_string()),
    );
    data
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Content type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    File,
    System,
}

impl MessageType {
    /// Parses a wire name, falling back to `Text` for anything unknown.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "image" => MessageType::Image,
            "video" => MessageType::Video,
            "audio" => MessageType::Audio,
            "file" => MessageType::File,
            "system" => MessageType::System,
            _ => MessageType::Text,
        }
    }
}

/// Delivery status of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Parses a wire name.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "sending" => Some(MessageStatus::Sending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            "failed" => Some(MessageStatus::Failed),
            _ => None,
        }
    }
}

/// A user as embedded in message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: UserId,
    pub nickname: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_verified: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen_at: Option<String>,
}

impl UserRef {
    /// Creates a user with only an id and display name.
    pub fn new(id: UserId, nickname: impl Into<String>) -> Self {
        UserRef {
            id,
            nickname: nickname.into(),
            avatar: None,
            is_verified: false,
            is_online: false,
            last_seen_at: None,
        }
    }

    /// Placeholder used when nothing is known about a sender.
    pub fn placeholder(id: UserId) -> Self {
        UserRef::new(id, format!("user{}", id))
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` integers some endpoints send.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        _ => false,
    })
}

/// A chat message received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub status: MessageStatus,
    pub is_recalled: bool,
    /// Server timestamp, kept verbatim.
    pub created_at: String,
    pub sender: UserRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Payload of a `newMessage` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub message: ChatMessageEvent,
}

/// Presence value for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
    Away,
}

/// Payload of a `user_status` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChange {
    pub user_id: UserId,
    pub status: UserStatus,
}

/// Payload of a `typing` envelope, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStatus {
    pub conversation_id: String,
    pub user_id: UserId,
    pub is_typing: bool,
}

/// What happened to a message in a `message_updated` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateType {
    Recalled,
    Deleted,
    Edited,
    StatusUpdated,
    Other(String),
}

impl UpdateType {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "recalled" => UpdateType::Recalled,
            "deleted" => UpdateType::Deleted,
            "edited" => UpdateType::Edited,
            "status_updated" => UpdateType::StatusUpdated,
            other => UpdateType::Other(other.to_string()),
        }
    }
}

/// Payload of a `message_updated` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUpdate {
    pub message_id: String,
    pub conversation_id: String,
    pub update_type: UpdateType,
    pub new_content: Option<String>,
    pub new_status: Option<MessageStatus>,
    /// Full message body, when the server includes one.
    pub message: Option<ChatMessageEvent>,
}

/// What changed in a `conversation_updated` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdateType {
    MemberAdded,
    MemberRemoved,
    InfoUpdated,
    Other(String),
}

impl ConversationUpdateType {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "member_added" => ConversationUpdateType::MemberAdded,
            "member_removed" => ConversationUpdateType::MemberRemoved,
            "info_updated" => ConversationUpdateType::InfoUpdated,
            other => ConversationUpdateType::Other(other.to_string()),
        }
    }
}

/// Payload of a `conversation_updated` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationUpdate {
    pub conversation_id: String,
    pub update_type: ConversationUpdateType,
    /// String-valued attributes only; other values are discarded.
    pub data: BTreeMap<String, String>,
}

/// Payload of a `conversationUnreadUpdated` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationUnreadUpdate {
    pub conversation_id: String,
    pub unread_count: u32,
    pub last_message: Option<ChatMessageEvent>,
    pub last_message_at: String,
}

/// Payload of `read_receipt` and `message_read` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub conversation_id: String,
    pub message_id: String,
    pub user_id: UserId,
    pub read_at: String,
}

/// Payload of a `connection` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAck {
    pub user_id: UserId,
    pub status: String,
    pub timestamp: String,
}

impl ConnectionAck {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }
}

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Ping,
    Pong,
    ConnectionAck(ConnectionAck),
    NewMessage(NewMessage),
    UserStatus(UserStatusChange),
    Typing(TypingStatus),
    MessageUpdated(MessageUpdate),
    ConversationUpdated(ConversationUpdate),
    ConversationUnreadUpdated(ConversationUnreadUpdate),
    ReadReceipt(ReadReceipt),
    MessageRead(ReadReceipt),
    /// Well-formed envelope this client has no handler for.
    Unhandled(Envelope),
}

impl InboundEvent {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundEvent::Ping => MessageKind::Ping,
            InboundEvent::Pong => MessageKind::Pong,
            InboundEvent::ConnectionAck(_) => MessageKind::ConnectionAck,
            InboundEvent::NewMessage(_) => MessageKind::NewMessage,
            InboundEvent::UserStatus(_) => MessageKind::UserStatus,
            InboundEvent::Typing(_) => MessageKind::Typing,
            InboundEvent::MessageUpdated(_) => MessageKind::MessageUpdated,
            InboundEvent::ConversationUpdated(_) => MessageKind::ConversationUpdated,
            InboundEvent::ConversationUnreadUpdated(_) => MessageKind::ConversationUnreadUpdated,
            InboundEvent::ReadReceipt(_) => MessageKind::ReadReceipt,
            InboundEvent::MessageRead(_) => MessageKind::MessageRead,
            InboundEvent::Unhandled(envelope) => envelope.kind.clone(),
        }
    }
}
