//! Bayeux wire model and session lifecycle.
//!
//! Implements the data side of the Bayeux protocol: message documents,
//! packets, validated channel routes, reconnect advice and the forward-only
//! session state machine.
//!
//! # Protocol Overview
//!
//! Clients talk to the server over a handful of reserved `/meta/` channels and
//! publish on any other channel.
//!
//! ## Message Flow
//!
//! ```text
//! Client                                   Server
//!    |                                        |
//!    |---- /meta/handshake (conn types) ---->|  Negotiate transport
//!    |<--- clientId, version, conn types ----|
//!    |                                        |
//!    |---- /meta/connect ------------------->|  First connect returns at once
//!    |<--- advice.interval = 0 --------------|  (after the long-poll wait)
//!    |                                        |
//!    |---- /meta/subscribe /foo/bar -------->|
//!    |<--- successful ------------------------|
//!    |                                        |
//!    |---- /meta/connect ------------------->|  Held open until timeout,
//!    |<--- response + queued deliveries -----|  draining queued messages
//!    |                                        |
//!    |---- /foo/bar (data) ----------------->|  Publish: ack to sender,
//!    |<--- successful ------------------------|  delivery to subscribers
//!    |                                        |
//!    |---- /meta/disconnect ---------------->|
//! ```
//!
//! ## State Machine
//!
//! | State          | Description                        | Valid Transitions         |
//! |----------------|------------------------------------|---------------------------|
//! | `Handshaking`  | Created, no handshake yet          | → Handshook, Disconnected |
//! | `Handshook`    | Handshake completed                | → Connected, Disconnected |
//! | `Connected`    | First connect completed            | → Disconnected            |
//! | `Disconnected` | Terminal                           | (terminal)                |
//!
//! ## Reconnect Advice
//!
//! | Code        | Meaning                             |
//! |-------------|-------------------------------------|
//! | `none`      | Do nothing extra                    |
//! | `retry`     | Retry the same operation            |
//! | `handshake` | Go back through handshake           |

pub mod advice;
pub mod message;
mod packet;
mod response;
mod route;
mod session;

pub use advice::Reconnect;
pub use message::Message;
pub use packet::{Packet, PacketType};
pub use response::{error_response, success_response, ResponseBuilder};
pub use route::{
    PathError, Route, CONNECT_ROUTE, DEEP_WILD, DISCONNECT_ROUTE, HANDSHAKE_ROUTE,
    SUBSCRIBE_ROUTE, UNSUBSCRIBE_ROUTE, WILD,
};
pub use session::{SessionState, SessionStateMachine};

/// Reserved prefix of the meta channels
pub const META_PREFIX: &str = "/meta/";

/// Bayeux protocol version advertised by default
pub const BAYEUX_VERSION: &str = "1.0";

/// Minimum Bayeux protocol version accepted by default
pub const MINIMUM_BAYEUX_VERSION: &str = "1.0";
