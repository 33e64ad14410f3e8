//! Packets: the unit handed between the engine, the transport and the
//! delivery collaborator.

use serde::{Deserialize, Serialize};

use super::{Message, Route};

/// What a packet is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PacketType {
    /// Reply to the requesting session
    Response,
    /// Broadcast to channel subscribers
    Delivery,
}

/// Messages bound for a session or a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Packet type
    pub packet_type: PacketType,
    /// Session the packet concerns (the requester for responses, the sender
    /// for deliveries)
    pub session_id: Option<String>,
    /// Route the packet travels on; absent when the request path never parsed
    pub route: Option<Route>,
    /// Messages in delivery order
    pub messages: Vec<Message>,
}

impl Packet {
    /// Create a RESPONSE packet
    pub fn response(session_id: Option<&str>, route: Option<Route>, messages: Vec<Message>) -> Self {
        Self {
            packet_type: PacketType::Response,
            session_id: session_id.map(str::to_string),
            route,
            messages,
        }
    }

    /// Create a DELIVERY packet
    pub fn delivery(session_id: &str, route: Route, message: Message) -> Self {
        Self {
            packet_type: PacketType::Delivery,
            session_id: Some(session_id.to_string()),
            route: Some(route),
            messages: vec![message],
        }
    }

    /// First message, which for responses is the operation's own reply
    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Whether this is a RESPONSE packet
    pub fn is_response(&self) -> bool {
        self.packet_type == PacketType::Response
    }

    /// Whether this is a DELIVERY packet
    pub fn is_delivery(&self) -> bool {
        self.packet_type == PacketType::Delivery
    }
}
