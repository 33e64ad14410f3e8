//! # Bayeux - Server-Side Publish/Subscribe Protocol Engine
//!
//! Protocol engine for the Bayeux messaging protocol used by CometD-style
//! real-time push systems. It routes inbound messages to the reserved meta
//! operations or to channel publish, enforces each operation's preconditions
//! in a fixed order, and drives every client session through a forward-only
//! lifecycle.
//!
//! ## Features
//!
//! - **Meta command routing**: handshake, connect, disconnect, subscribe, unsubscribe
//! - **Precondition ladders**: first failing check wins, each with its own error and advice
//! - **Session state machine**: atomic, forward-only transitions
//! - **Long-poll delivery**: bounded, cancellable waits that drain queued messages
//! - **Wildcard channels**: `/foo/*` and `/foo/**` subscriptions
//! - **HTTP endpoint**: Axum-based long-polling transport
//!
//! ## Protocol Overview
//!
//! ```text
//! Client                         Engine                        Subscribers
//!    |                              |                                |
//!    |--- /meta/handshake -------->|                                |
//!    |<-- clientId ----------------|                                |
//!    |--- /meta/connect ---------->|                                |
//!    |<-- advice.interval = 0 -----|                                |
//!    |--- /meta/subscribe -------->|                                |
//!    |<-- successful --------------|                                |
//!    |--- /chat/room (data) ------>|------- DELIVERY -------------->|
//!    |<-- successful --------------|                                |
//!    |--- /meta/disconnect ------->|                                |
//! ```
//!
//! ### Session Lifecycle
//!
//! ```text
//!  complete_handshake()     complete_connection()
//! [Handshaking] ────────> [Handshook] ────────> [Connected]
//!       │                      │                     │
//!       └──────────────────────┴─────────────────────┴──> [Disconnected]
//!                        complete_disconnect()
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bayeux::{config::Config, memory::MemoryServer, meta, Message};
//! use tokio_util::sync::CancellationToken;
//!
//! let server = MemoryServer::from_config(&Config::default());
//! let protocol = server.long_polling_protocol().unwrap();
//! let session = server.create_session();
//!
//! let request = Message::from_json(
//!     r#"{"channel":"/meta/handshake","supportedConnectionTypes":["long-polling"]}"#,
//! )?;
//! let packet = meta::dispatch(&*protocol, &server, &*session, &request, &CancellationToken::new()).await?;
//! assert!(packet.first().unwrap().is_successful());
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Messages, packets, routes, advice and session states
//! - [`api`]: Collaborator traits the engine borrows
//! - [`meta`]: Routing and the operation processors
//! - [`memory`]: In-process server, session and channel implementations
//! - [`server`]: HTTP API server (Axum-based)
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod meta;
pub mod protocol;
pub mod server;

// Re-exports for convenience
pub use api::{Channel, Protocol, SecurityPolicy, Server, Session};
pub use config::Config;
pub use error::{BayeuxError, Result};
pub use memory::{MemoryChannel, MemoryServer, MemorySession, TransportProtocol};
pub use meta::{dispatch, LongPoll, LongPollTiming, MetaCommand};
pub use protocol::{Message, Packet, PacketType, Reconnect, Route, SessionState};
pub use server::{AppState, HttpServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
