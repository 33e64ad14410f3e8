//! Publish on an ordinary channel.
//!
//! A successful publish produces two independent packets: a DELIVERY handed
//! to the server for fan-out, and the RESPONSE acknowledging the publisher.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::api::{Channel, Server, Session};
use crate::protocol::message::{CHANNEL, DATA, ID};
use crate::protocol::{
    error_response, success_response, Message, Packet, Reconnect, Route, META_PREFIX,
};

pub(super) fn process(server: &dyn Server, session: &dyn Session, request: &Message) -> Packet {
    let Some(path) = request.channel() else {
        let response = error_response(
            Value::Null,
            request,
            request.session_id(),
            "Missing channel",
            None,
        );
        return Packet::response(request.session_id(), None, vec![response]);
    };

    let route = match Route::parse(path) {
        Ok(route) => route,
        Err(e) => {
            let response = error_response(path, request, request.session_id(), &e.to_string(), None);
            return Packet::response(request.session_id(), None, vec![response]);
        }
    };

    let refuse = |session_id: Option<&str>, error: &str, reconnect: Option<Reconnect>| {
        let response = error_response(path, request, request.session_id(), error, reconnect);
        Packet::response(session_id, Some(route.clone()), vec![response])
    };

    let state = session.state();
    if request.session_id() != Some(session.id()) || !state.is_handshook() {
        return refuse(
            request.session_id(),
            "Handshake required",
            Some(Reconnect::Handshake),
        );
    }

    if !state.is_connected() {
        return refuse(
            Some(session.id()),
            "Connection required",
            Some(Reconnect::Retry),
        );
    }

    if path.starts_with(META_PREFIX) {
        return refuse(
            Some(session.id()),
            "Attempted to publish to a meta channel",
            None,
        );
    }

    let policy = server.security_policy();

    let channel: Arc<dyn Channel> = match server.find_channel(path) {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            if policy.is_some_and(|p| !p.can_create(session, path, request)) {
                return refuse(Some(session.id()), "Unauthorized", Some(Reconnect::None));
            }
            match server.require_channel(path) {
                Ok(channel) => channel,
                Err(e) => return refuse(Some(session.id()), &e.to_string(), None),
            }
        }
        Err(e) => return refuse(Some(session.id()), &e.to_string(), None),
    };

    if policy.is_some_and(|p| !p.can_publish(session, &*channel, request)) {
        return refuse(Some(session.id()), "Unauthorized", Some(Reconnect::None));
    }

    let broadcast = Message::new()
        .with(CHANNEL, path)
        .with(ID, request.get(ID).cloned().unwrap_or(Value::Null))
        .with(DATA, request.data().cloned().unwrap_or(Value::Null));

    trace!(session = session.id(), channel = path, "Publishing");
    server.deliver(session, Packet::delivery(session.id(), route.clone(), broadcast));

    let response = success_response(path, request, request.session_id(), None);
    Packet::response(Some(session.id()), Some(route), vec![response])
}
