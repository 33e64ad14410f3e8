//! `/meta/handshake`

use serde_json::Value;

use crate::api::{advertised_transport_names, Protocol, Server, Session};
use crate::protocol::message::{MINIMUM_VERSION, SUPPORTED_CONNECTION_TYPES, VERSION};
use crate::protocol::{
    error_response, success_response, Message, Packet, Reconnect, SessionState, HANDSHAKE_ROUTE,
};

pub(super) fn process(
    protocol: &dyn Protocol,
    server: &dyn Server,
    session: &dyn Session,
    request: &Message,
) -> Packet {
    if let Some(policy) = server.security_policy() {
        if !policy.can_handshake(session, request) {
            return reply(session, refusal(server, session, request, "Unauthorized", Reconnect::None));
        }
    }

    if session.state() >= SessionState::Handshook {
        return reply(
            session,
            refusal(
                server,
                session,
                request,
                "Handshake was previously completed",
                Reconnect::Retry,
            ),
        );
    }

    if !supports_connection_type(protocol, request) {
        return reply(
            session,
            refusal(
                server,
                session,
                request,
                "Handshake attempted on an unsupported transport",
                Reconnect::Handshake,
            ),
        );
    }

    session.complete_handshake();

    let response = success_response(HANDSHAKE_ROUTE.path(), request, Some(session.id()), None);
    reply(
        session,
        with_versions(server, response, protocol.transport_names()),
    )
}

fn reply(session: &dyn Session, message: Message) -> Packet {
    Packet::response(Some(session.id()), Some(HANDSHAKE_ROUTE.clone()), vec![message])
}

// Refusals advertise every transport the server knows, not only the
// negotiating protocol's, so the client can pick another.
fn refusal(
    server: &dyn Server,
    session: &dyn Session,
    request: &Message,
    error: &str,
    reconnect: Reconnect,
) -> Message {
    let response = error_response(
        HANDSHAKE_ROUTE.path(),
        request,
        Some(session.id()),
        error,
        Some(reconnect),
    );
    with_versions(server, response, &advertised_transport_names(server))
}

fn with_versions(server: &dyn Server, response: Message, transports: &[String]) -> Message {
    response
        .with(VERSION, server.bayeux_version())
        .with(MINIMUM_VERSION, server.minimum_bayeux_version())
        .with(
            SUPPORTED_CONNECTION_TYPES,
            Value::Array(transports.iter().cloned().map(Value::String).collect()),
        )
}

/// Any overlap between offered connection types and the protocol's transports.
fn supports_connection_type(protocol: &dyn Protocol, request: &Message) -> bool {
    let transports = protocol.transport_names();

    request
        .supported_connection_types()
        .into_iter()
        .any(|offered| transports.iter().any(|t| t == offered))
}
