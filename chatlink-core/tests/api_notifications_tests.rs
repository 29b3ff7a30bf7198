//! Tests for api::notifications

use chatlink_core::api::*;
use chatlink_core::network::*;

fn message(nickname: &str, content: &str) -> ChatMessageEvent {
    ChatMessageEvent {
        id: "m1".into(),
        conversation_id: "c1".into(),
        sender_id: 3,
        content: content.into(),
        kind: MessageType::Text,
        status: MessageStatus::Delivered,
        is_recalled: false,
        created_at: "t".into(),
        sender: UserRef::new(3, nickname),
        reply_to_message_id: None,
        media_url: None,
        media_duration: None,
        thumbnail_url: None,
    }
}

struct Screen {
    foreground: bool,
    active: Option<&'static str>,
}

impl NotificationSink for Screen {
    fn is_foreground(&self) -> bool {
        self.foreground
    }

    fn active_conversation(&self) -> Option<String> {
        self.active.map(str::to_string)
    }

    fn schedule(&self, _notification: LocalNotification) {}
}

#[test]
fn test_notification_from_message() {
    let notification = LocalNotification::for_message(&message("Alice", "hi"));
    assert_eq!(notification.title, "Alice");
    assert_eq!(notification.body, "hi");
    assert_eq!(notification.conversation_id, "c1");
    assert_eq!(notification.message_id, "m1");
    assert_eq!(notification.sender_id, 3);
}

#[test]
fn test_notification_fallback_text() {
    let notification = LocalNotification::for_message(&message("", ""));
    assert_eq!(notification.title, "New message");
    assert_eq!(notification.body, "You received a new message");
}

#[test]
fn test_should_notify_in_background() {
    let screen = Screen {
        foreground: false,
        active: Some("c1"),
    };
    assert!(screen.should_notify("c1"));
}

#[test]
fn test_should_not_notify_for_open_conversation() {
    let screen = Screen {
        foreground: true,
        active: Some("c1"),
    };
    assert!(!screen.should_notify("c1"));
    assert!(screen.should_notify("c2"));
}

#[test]
fn test_should_notify_in_foreground_without_open_conversation() {
    let screen = Screen {
        foreground: true,
        active: None,
    };
    assert!(screen.should_notify("c1"));
}

#[test]
fn test_noop_never_notifies() {
    assert!(!NoopNotifications.should_notify("c1"));
}
