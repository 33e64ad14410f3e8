//! Collaborator contracts consumed by the engine.
//!
//! The engine never owns sessions, channels or transports. It borrows them for
//! the duration of one request through these traits:
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │                MetaCommand                │
//! │  (router + handshake/connect/... ladders) │
//! └──────┬──────────┬──────────┬──────────┬───┘
//!        │          │          │          │
//!        ▼          ▼          ▼          ▼
//!    ┌────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐
//!    │ Server │ │ Session │ │ Channel │ │ Protocol │
//!    └───┬────┘ └─────────┘ └─────────┘ └──────────┘
//!        │
//!        ▼
//!  ┌────────────────┐
//!  │ SecurityPolicy │
//!  └────────────────┘
//! ```
//!
//! [`crate::memory`] provides in-process implementations of all of them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{Message, Packet, PathError, Route, SessionState};

/// A client session as seen by the engine.
///
/// State changes go through the three `complete_*` operations only.
pub trait Session: Send + Sync {
    /// Stable session identifier (the `clientId` on the wire)
    fn id(&self) -> &str;

    /// Current lifecycle stage
    fn state(&self) -> SessionState;

    /// HANDSHAKING → HANDSHOOK
    fn complete_handshake(&self);

    /// HANDSHOOK → CONNECTED
    fn complete_connection(&self);

    /// Any state → DISCONNECTED
    fn complete_disconnect(&self);

    /// Wait up to `timeout` for the next queued packet.
    ///
    /// Must be a bounded, non-spinning wait. A zero timeout only checks the
    /// queue. Dropping the returned future abandons the wait without losing
    /// any queued packet.
    fn poll(&self, timeout: Duration) -> Pin<Box<dyn Future<Output = Option<Packet>> + Send + '_>>;
}

/// A channel in the server's registry
pub trait Channel: Send + Sync {
    /// Validated route of the channel
    fn route(&self) -> &Route;

    /// Add a subscriber. Returns `false` if the channel refuses (closed).
    fn subscribe(&self, session: &dyn Session) -> bool;

    /// Remove a subscriber; a no-op if it was never subscribed
    fn unsubscribe(&self, session: &dyn Session);

    /// Whether the channel has been closed
    fn is_closed(&self) -> bool;
}

/// Authorization decisions. Every check defaults to allow.
pub trait SecurityPolicy: Send + Sync {
    /// May this session handshake?
    fn can_handshake(&self, _session: &dyn Session, _request: &Message) -> bool {
        true
    }

    /// May this session cause the channel at `path` to be created?
    fn can_create(&self, _session: &dyn Session, _path: &str, _request: &Message) -> bool {
        true
    }

    /// May this session subscribe to the channel?
    fn can_subscribe(&self, _session: &dyn Session, _channel: &dyn Channel, _request: &Message) -> bool {
        true
    }

    /// May this session publish on the channel?
    fn can_publish(&self, _session: &dyn Session, _channel: &dyn Channel, _request: &Message) -> bool {
        true
    }
}

/// A protocol variant (transport family) registered on the server
pub trait Protocol: Send + Sync {
    /// Protocol name
    fn name(&self) -> &str;

    /// Connection type names this protocol accepts
    fn transport_names(&self) -> &[String];

    /// Whether connects are held open server-side
    fn is_long_polling(&self) -> bool;

    /// Default long-poll timeout in milliseconds
    fn long_poll_timeout_ms(&self) -> i64;

    /// Default long-poll interval in milliseconds
    fn long_poll_interval_ms(&self) -> i64;
}

/// The server hosting sessions and channels
pub trait Server: Send + Sync {
    /// Installed security policy, if any
    fn security_policy(&self) -> Option<&dyn SecurityPolicy>;

    /// Bayeux version advertised in handshake responses
    fn bayeux_version(&self) -> &str;

    /// Minimum Bayeux version accepted
    fn minimum_bayeux_version(&self) -> &str;

    /// Existing channel at `path`, if any
    fn find_channel(&self, path: &str) -> Result<Option<Arc<dyn Channel>>, PathError>;

    /// Existing or newly created channel at `path`
    fn require_channel(&self, path: &str) -> Result<Arc<dyn Channel>, PathError>;

    /// Hand a packet to fan-out
    fn deliver(&self, sender: &dyn Session, packet: Packet);

    /// Names of every registered protocol
    fn protocol_names(&self) -> Vec<String>;

    /// Protocol by name
    fn protocol(&self, name: &str) -> Option<Arc<dyn Protocol>>;
}

/// Union of transport names over every protocol registered on `server`,
/// in first-seen order.
pub fn advertised_transport_names(server: &dyn Server) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for protocol in server
        .protocol_names()
        .iter()
        .filter_map(|name| server.protocol(name))
    {
        for transport in protocol.transport_names() {
            if !names.contains(transport) {
                names.push(transport.clone());
            }
        }
    }

    names
}
