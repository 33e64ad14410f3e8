//! `/meta/connect`

use tokio_util::sync::CancellationToken;

use super::long_poll::{LongPoll, LongPollTiming};
use crate::api::{Protocol, Session};
use crate::protocol::{
    error_response, Message, Packet, Reconnect, ResponseBuilder, CONNECT_ROUTE,
};

pub(super) async fn process(
    protocol: &dyn Protocol,
    session: &dyn Session,
    request: &Message,
    cancel: &CancellationToken,
) -> Packet {
    let path = CONNECT_ROUTE.path();

    let state = session.state();
    if request.session_id() != Some(session.id()) || !state.is_handshook() {
        let response = error_response(
            path,
            request,
            request.session_id(),
            "Handshake required",
            Some(Reconnect::Handshake),
        );
        return Packet::response(request.session_id(), Some(CONNECT_ROUTE.clone()), vec![response]);
    }

    let first = !state.is_connected();

    if first && !accepts_connection_type(protocol, request) {
        let response = error_response(
            path,
            request,
            Some(session.id()),
            "Connection requested on an unsupported transport",
            Some(Reconnect::Handshake),
        );
        return Packet::response(Some(session.id()), Some(CONNECT_ROUTE.clone()), vec![response]);
    }

    let timing = LongPollTiming::negotiate(protocol, request);

    // First connect tells the client to come straight back
    let response = ResponseBuilder::new(path, request, Some(session.id()))
        .success()
        .interval(if first { 0 } else { timing.interval_ms })
        .build();

    if first {
        session.complete_connection();
    }

    let mut messages = vec![response];
    if protocol.is_long_polling() {
        messages.extend(LongPoll::new(timing).run(session, cancel).await);
    }

    Packet::response(Some(session.id()), Some(CONNECT_ROUTE.clone()), messages)
}

fn accepts_connection_type(protocol: &dyn Protocol, request: &Message) -> bool {
    request
        .connection_type()
        .is_some_and(|requested| protocol.transport_names().iter().any(|t| t == requested))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::meta::fixture;
    use crate::protocol::advice::INTERVAL;
    use crate::protocol::SessionState;

    fn connect(session: &dyn Session) -> Message {
        Message::new()
            .with("channel", "/meta/connect")
            .with("id", "c1")
            .with("clientId", session.id())
            .with("connectionType", "long-polling")
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_requires_handshake() {
        let server = fixture::server(0);
        let protocol = server.long_polling_protocol().unwrap();
        let session = server.create_session();

        let packet = process(&*protocol, &*session, &connect(&*session), &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert!(!response.is_successful());
        assert_eq!(response.error(), Some("Handshake required"));
        assert_eq!(response.reconnect(), Some("handshake"));
        assert_eq!(session.state(), SessionState::Handshaking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_disconnect() {
        let server = fixture::server(3000);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::connected(&server);
        session.complete_disconnect();

        let start = Instant::now();
        let packet = process(&*protocol, &*session, &connect(&*session), &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert!(!response.is_successful());
        assert_eq!(response.error(), Some("Handshake required"));
        assert_eq!(response.reconnect(), Some("handshake"));
        assert_eq!(packet.messages.len(), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_rejects_foreign_session_id() {
        let server = fixture::server(0);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::handshook(&server);

        let request = connect(&*session).with("clientId", "someone-else");
        let packet = process(&*protocol, &*session, &request, &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert_eq!(response.error(), Some("Handshake required"));
        assert_eq!(response.session_id(), Some("someone-else"));
        assert_eq!(packet.session_id.as_deref(), Some("someone-else"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_connect_unsupported_transport() {
        let server = fixture::server(0);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::handshook(&server);

        let request = connect(&*session).with("connectionType", "carrier-pigeon");
        let packet = process(&*protocol, &*session, &request, &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert_eq!(
            response.error(),
            Some("Connection requested on an unsupported transport")
        );
        assert_eq!(response.reconnect(), Some("handshake"));
        assert_eq!(session.state(), SessionState::Handshook);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_connect_advises_zero_interval() {
        let server = fixture::server(0);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::handshook(&server);

        let request = connect(&*session).with("advice", json!({"interval": 5000}));
        let packet = process(&*protocol, &*session, &request, &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert!(response.is_successful());
        assert_eq!(response.advice_millis(INTERVAL), Some(0));
        assert_eq!(response.get("id"), Some(&json!("c1")));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_connect_skips_transport_check() {
        let server = fixture::server(0);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::connected(&server);

        let request = connect(&*session)
            .with("connectionType", "carrier-pigeon")
            .with("advice", json!({"interval": 250}));
        let packet = process(&*protocol, &*session, &request, &CancellationToken::new()).await;
        let response = packet.first().unwrap();

        assert!(response.is_successful());
        assert_eq!(response.advice_millis(INTERVAL), Some(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_holds_for_timeout_and_returns_queued() {
        let server = fixture::server(3000);
        let protocol = server.long_polling_protocol().unwrap();
        let session = fixture::connected(&server);

        let producer = {
            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                session.enqueue(fixture::delivery("/foo", json!("hello")));
            })
        };

        let start = Instant::now();
        let packet = process(&*protocol, &*session, &connect(&*session), &CancellationToken::new()).await;
        producer.await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert!(start.elapsed() < Duration::from_millis(3005));
        assert_eq!(packet.messages.len(), 2);
        assert!(packet.messages[0].is_successful());
        assert_eq!(packet.messages[1].data(), Some(&json!("hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_protocol_does_not_wait() {
        let server = fixture::server(3000);
        let protocol = server.protocol_by_name("websocket").unwrap();
        let session = fixture::connected(&server);

        let start = Instant::now();
        let request = connect(&*session).with("connectionType", "websocket");
        let packet = process(&*protocol, &*session, &request, &CancellationToken::new()).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(packet.messages.len(), 1);
    }
}
