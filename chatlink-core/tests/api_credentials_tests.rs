//! Tests for api::credentials

use chatlink_core::api::*;
use chatlink_core::network::UserRef;

#[test]
fn test_default_has_no_token() {
    let credentials = StaticCredentials::default();
    assert_eq!(credentials.token(), None);
    assert!(!credentials.has_token());
    assert_eq!(credentials.current_user(), None);
}

#[test]
fn test_empty_token_counts_as_missing() {
    let credentials = StaticCredentials::with_token("");
    assert!(!credentials.has_token());
}

#[test]
fn test_token_can_be_swapped() {
    let credentials = StaticCredentials::with_token("first");
    credentials.set_token(Some("second".into()));
    assert_eq!(credentials.token().as_deref(), Some("second"));

    credentials.set_token(None);
    assert!(!credentials.has_token());
}

#[test]
fn test_current_user() {
    let credentials = StaticCredentials::new(None, Some(UserRef::new(7, "Me")));
    assert_eq!(credentials.current_user().map(|u| u.id), Some(7));

    credentials.set_user(None);
    assert_eq!(credentials.current_user(), None);
}

#[test]
fn test_debug_redacts_token() {
    let credentials = StaticCredentials::with_token("super-secret");
    let debug = format!("{:?}", credentials);
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("<redacted>"));
}
