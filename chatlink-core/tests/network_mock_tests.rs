//! Tests for network::mock

use std::time::Duration;

use chatlink_core::network::*;
use url::Url;

fn target() -> Url {
    Url::parse("wss://chat.test/ws?token=t").unwrap()
}

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn test_connector_accepts_by_default() {
    let connector = MockConnector::new();

    let transport = connector.open(&target(), TIMEOUT).await.unwrap();

    assert_eq!(transport.state(), TransportState::Open);
    assert_eq!(connector.open_count(), 1);
    assert_eq!(connector.server_count(), 1);
    assert_eq!(connector.opened_urls(), vec![target()]);
}

#[tokio::test]
async fn test_connector_script_then_fallback() {
    let connector = MockConnector::new();
    connector.refuse_next(NetworkError::Timeout);
    connector.script(OpenOutcome::Accept);
    connector.refuse_all(NetworkError::ConnectionFailed("down".into()));

    assert_eq!(
        connector.open(&target(), TIMEOUT).await.err(),
        Some(NetworkError::Timeout)
    );
    assert!(connector.open(&target(), TIMEOUT).await.is_ok());
    assert!(connector.open(&target(), TIMEOUT).await.is_err());

    connector.accept_all();
    assert!(connector.open(&target(), TIMEOUT).await.is_ok());

    assert_eq!(connector.open_count(), 4);
    assert_eq!(connector.server_count(), 2);
    assert!(connector.last_server().is_some());
    assert!(connector.server(2).is_none());
}

#[tokio::test]
async fn test_server_frames_reach_client() {
    let (transport, server) = MockTransport::pair();

    server.push_text("hello");
    server.push_envelope(&Envelope::pong());

    assert_eq!(transport.receive().await.unwrap(), Frame::Text("hello".into()));
    let frame = transport.receive().await.unwrap();
    assert_eq!(
        decode_envelope(frame.data().unwrap()).unwrap(),
        Envelope::pong()
    );
}

#[tokio::test]
async fn test_client_sends_are_recorded() {
    let (transport, server) = MockTransport::pair();

    transport
        .send(Frame::Binary(encode_envelope(&Envelope::ping()).unwrap()))
        .await
        .unwrap();
    transport.send(Frame::Text("junk".into())).await.unwrap();

    assert_eq!(server.sent_frames().len(), 2);
    assert_eq!(server.sent_envelopes(), vec![Envelope::ping()]);
    assert_eq!(server.wait_for_sent(2).await.len(), 1);
}

#[tokio::test]
async fn test_server_close_then_stream_ends() {
    let (transport, server) = MockTransport::pair();

    server.close(CloseCode::GoingAway);

    assert_eq!(
        transport.receive().await.unwrap(),
        Frame::Close {
            code: Some(CloseCode::GoingAway),
            reason: String::new()
        }
    );
    assert_eq!(transport.state(), TransportState::Closing);
    assert_eq!(
        transport.receive().await,
        Err(NetworkError::ConnectionClosed)
    );

    transport.close(CloseCode::Normal).await.unwrap();
    assert!(server.is_closed());
    assert_eq!(server.client_close_code(), Some(CloseCode::Normal));
}

#[tokio::test]
async fn test_dropped_server_ends_stream() {
    let (transport, server) = MockTransport::pair();
    drop(server);

    assert_eq!(
        transport.receive().await,
        Err(NetworkError::ConnectionClosed)
    );
}

#[tokio::test]
async fn test_injected_failures() {
    let (transport, server) = MockTransport::pair();

    server.fail(NetworkError::ReceiveFailed("reset".into()));
    assert_eq!(
        transport.receive().await,
        Err(NetworkError::ReceiveFailed("reset".into()))
    );

    server.fail_sends(Some(NetworkError::SendFailed("pipe".into())));
    assert!(transport.send(Frame::Text("x".into())).await.is_err());
    server.fail_sends(None);
    assert!(transport.send(Frame::Text("x".into())).await.is_ok());
}

#[tokio::test]
async fn test_close_is_idempotent_and_records_first_code() {
    let (transport, server) = MockTransport::pair();

    transport.close(CloseCode::Normal).await.unwrap();
    transport.close(CloseCode::GoingAway).await.unwrap();

    assert!(server.is_closed());
    assert_eq!(server.client_close_code(), Some(CloseCode::Normal));
    assert_eq!(
        transport.send(Frame::Text("late".into())).await,
        Err(NetworkError::NotConnected)
    );
}
