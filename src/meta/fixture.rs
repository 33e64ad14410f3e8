//! Shared setup for processor tests.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{Channel, SecurityPolicy, Server, Session};
use crate::config::{BayeuxConfig, ProtocolConfig};
use crate::memory::{MemoryServer, MemorySession};
use crate::protocol::{Message, Packet, Route};

/// Server with a long-polling and a websocket protocol
pub fn server(long_poll_timeout_ms: i64) -> MemoryServer {
    MemoryServer::new(
        &BayeuxConfig::default(),
        &[
            ProtocolConfig::long_polling("long-polling", &["long-polling"], long_poll_timeout_ms, 0),
            ProtocolConfig::streaming("websocket", &["websocket"]),
        ],
    )
}

pub fn handshook(server: &MemoryServer) -> Arc<MemorySession> {
    let session = server.create_session();
    session.complete_handshake();
    session
}

pub fn connected(server: &MemoryServer) -> Arc<MemorySession> {
    let session = handshook(server);
    session.complete_connection();
    session
}

/// Connected session subscribed to `path`
pub fn subscribed(server: &MemoryServer, path: &str) -> Arc<MemorySession> {
    let session = connected(server);
    let channel = server.require_channel(path).unwrap();
    assert!(channel.subscribe(&*session));
    session
}

pub fn delivery(path: &str, data: Value) -> Packet {
    Packet::delivery(
        "publisher",
        Route::parse(path).unwrap(),
        Message::new().with("channel", path).with("data", data),
    )
}

/// Policy that refuses exactly one kind of request
#[derive(Debug, Default)]
pub struct Deny {
    handshake: bool,
    create: bool,
    subscribe: bool,
    publish: bool,
}

impl Deny {
    pub fn handshake() -> Self {
        Self {
            handshake: true,
            ..Self::default()
        }
    }

    pub fn create() -> Self {
        Self {
            create: true,
            ..Self::default()
        }
    }

    pub fn subscribe() -> Self {
        Self {
            subscribe: true,
            ..Self::default()
        }
    }

    pub fn publish() -> Self {
        Self {
            publish: true,
            ..Self::default()
        }
    }
}

impl SecurityPolicy for Deny {
    fn can_handshake(&self, _session: &dyn Session, _request: &Message) -> bool {
        !self.handshake
    }

    fn can_create(&self, _session: &dyn Session, _path: &str, _request: &Message) -> bool {
        !self.create
    }

    fn can_subscribe(&self, _session: &dyn Session, _channel: &dyn Channel, _request: &Message) -> bool {
        !self.subscribe
    }

    fn can_publish(&self, _session: &dyn Session, _channel: &dyn Channel, _request: &Message) -> bool {
        !self.publish
    }
}
