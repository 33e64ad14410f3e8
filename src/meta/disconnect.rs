//! `/meta/disconnect`
//!
//! Unconditional: the session is moved to DISCONNECTED whatever state it was
//! in, and the client is told not to come back.

use crate::api::Session;
use crate::protocol::{success_response, Message, Packet, Reconnect, DISCONNECT_ROUTE};

pub(super) fn process(session: &dyn Session, request: &Message) -> Packet {
    session.complete_disconnect();

    let response = success_response(
        DISCONNECT_ROUTE.path(),
        request,
        request.session_id(),
        Some(Reconnect::None),
    );

    Packet::response(
        request.session_id(),
        Some(DISCONNECT_ROUTE.clone()),
        vec![response],
    )
}
