//! `/meta/subscribe` and `/meta/unsubscribe`.
//!
//! Both share the same leading checks. Every response echoes the requested
//! `subscription`, as `null` when it was missing.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{Channel, Server, Session};
use crate::protocol::message::SUBSCRIPTION;
use crate::protocol::{
    Message, Packet, Reconnect, ResponseBuilder, Route, META_PREFIX,
    SUBSCRIBE_ROUTE, UNSUBSCRIBE_ROUTE,
};

/// Outcome of one subscription request, before it is written out
struct Reply<'a> {
    route: &'a Route,
    request: &'a Message,
    packet_session: Option<&'a str>,
}

impl<'a> Reply<'a> {
    fn new(route: &'a Route, request: &'a Message) -> Self {
        Self {
            route,
            request,
            packet_session: request.session_id(),
        }
    }

    fn builder(&self) -> ResponseBuilder {
        ResponseBuilder::new(self.route.path(), self.request, self.request.session_id()).field(
            SUBSCRIPTION,
            self.request
                .subscription()
                .filter(|s| !s.is_empty())
                .map_or(Value::Null, Value::from),
        )
    }

    fn packet(&self, response: Message) -> Packet {
        Packet::response(self.packet_session, Some(self.route.clone()), vec![response])
    }

    fn success(&self) -> Packet {
        self.packet(self.builder().success().build())
    }

    fn failure(&self, error: &str, reconnect: Option<Reconnect>) -> Packet {
        self.packet(self.builder().failure(error).reconnect(reconnect).build())
    }
}

/// Checks shared by subscribe and unsubscribe. Yields the requested path.
fn admit<'a>(
    reply: &mut Reply<'a>,
    session: &'a dyn Session,
    request: &'a Message,
) -> Result<&'a str, Packet> {
    let subscription = match request.subscription() {
        Some(subscription) if !subscription.is_empty() => subscription,
        _ => return Err(reply.failure("Missing subscription", None)),
    };

    let state = session.state();
    if request.session_id() != Some(session.id()) || !state.is_handshook() {
        return Err(reply.failure("Handshake required", Some(Reconnect::Handshake)));
    }

    reply.packet_session = Some(session.id());

    if !state.is_connected() {
        return Err(reply.failure("Connection required", Some(Reconnect::Retry)));
    }

    if subscription.starts_with(META_PREFIX) {
        return Err(reply.failure("Attempted subscription to a meta channel", None));
    }

    if let Err(e) = Route::parse(subscription) {
        return Err(reply.failure(&e.to_string(), None));
    }

    Ok(subscription)
}

pub(super) fn subscribe(server: &dyn Server, session: &dyn Session, request: &Message) -> Packet {
    let mut reply = Reply::new(&SUBSCRIBE_ROUTE, request);

    let path = match admit(&mut reply, session, request) {
        Ok(path) => path,
        Err(packet) => return packet,
    };

    let policy = server.security_policy();

    let channel: Arc<dyn Channel> = match server.find_channel(path) {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            if policy.is_some_and(|p| !p.can_create(session, path, request)) {
                return reply.failure("Unauthorized", Some(Reconnect::None));
            }
            match server.require_channel(path) {
                Ok(channel) => channel,
                Err(e) => return reply.failure(&e.to_string(), None),
            }
        }
        Err(e) => return reply.failure(&e.to_string(), None),
    };

    if policy.is_some_and(|p| !p.can_subscribe(session, &*channel, request)) {
        return reply.failure("Unauthorized", Some(Reconnect::None));
    }

    if !channel.subscribe(session) {
        return reply.failure("Attempted subscription to a closed channel", None);
    }

    // Disconnected while subscribing
    if !session.state().is_handshook() {
        channel.unsubscribe(session);
        return reply.failure("Handshake required", Some(Reconnect::Handshake));
    }

    reply.success()
}

pub(super) fn unsubscribe(server: &dyn Server, session: &dyn Session, request: &Message) -> Packet {
    let mut reply = Reply::new(&UNSUBSCRIBE_ROUTE, request);

    let path = match admit(&mut reply, session, request) {
        Ok(path) => path,
        Err(packet) => return packet,
    };

    match server.find_channel(path) {
        Ok(Some(channel)) => channel.unsubscribe(session),
        Ok(None) => {}
        Err(e) => return reply.failure(&e.to_string(), None),
    }

    reply.success()
}
