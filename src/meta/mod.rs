//! Meta command routing and processing.
//!
//! Every inbound message is resolved to one [`MetaCommand`] by its channel
//! path, then run through that command's precondition ladder. Each ladder
//! checks its preconditions in a fixed order and stops at the first failure,
//! answering with a well-formed error response:
//!
//! | Command       | Ladder (first failing step wins)                                   |
//! |---------------|--------------------------------------------------------------------|
//! | `Handshake`   | policy → already handshook → transport overlap                     |
//! | `Connect`     | session/handshake → transport (first connect only)                 |
//! | `Disconnect`  | none                                                               |
//! | `Subscribe`   | subscription → handshake → connection → meta → path → create → subscribe → closed |
//! | `Unsubscribe` | subscription → handshake → connection → meta → path                |
//! | `Publish`     | channel → path → handshake → connection → meta → lookup → create → publish |
//!
//! Only routing itself can fail with an `Err`: a message with no `channel`,
//! or a `/meta/` channel that is none of the five commands.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bayeux::meta::dispatch;
//!
//! let packet = dispatch(&*protocol, &server, &*session, &request, &cancel).await?;
//! transport.send(packet.messages);
//! ```

mod connect;
mod disconnect;
#[cfg(test)]
mod fixture;
mod handshake;
mod long_poll;
mod publish;
mod subscription;

pub use long_poll::{LongPoll, LongPollTiming};

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{Protocol, Server, Session};
use crate::error::{BayeuxError, Result};
use crate::protocol::{
    Message, Packet, Route, CONNECT_ROUTE, DISCONNECT_ROUTE, HANDSHAKE_ROUTE, META_PREFIX,
    SUBSCRIBE_ROUTE, UNSUBSCRIBE_ROUTE,
};

/// The six operations a message can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaCommand {
    /// `/meta/handshake`
    Handshake,
    /// `/meta/connect`
    Connect,
    /// `/meta/disconnect`
    Disconnect,
    /// `/meta/subscribe`
    Subscribe,
    /// `/meta/unsubscribe`
    Unsubscribe,
    /// Any other channel
    Publish,
}

impl MetaCommand {
    const COMMANDS: [MetaCommand; 5] = [
        MetaCommand::Handshake,
        MetaCommand::Connect,
        MetaCommand::Disconnect,
        MetaCommand::Subscribe,
        MetaCommand::Unsubscribe,
    ];

    /// Resolve a channel path to a command.
    ///
    /// The five meta commands match by exact path. Any other `/meta/` path is
    /// a routing error, as is a missing path; everything else is a publish.
    pub fn from_path(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Err(BayeuxError::missing_channel());
        };

        if let Some(command) = Self::COMMANDS
            .iter()
            .find(|command| command.route().is_some_and(|route| route.path() == path))
        {
            return Ok(*command);
        }

        if path.starts_with(META_PREFIX) {
            Err(BayeuxError::meta_publish())
        } else {
            Ok(MetaCommand::Publish)
        }
    }

    /// Fixed route of a meta command; publish has none
    pub fn route(&self) -> Option<&'static Route> {
        match self {
            Self::Handshake => Some(&*HANDSHAKE_ROUTE),
            Self::Connect => Some(&*CONNECT_ROUTE),
            Self::Disconnect => Some(&*DISCONNECT_ROUTE),
            Self::Subscribe => Some(&*SUBSCRIBE_ROUTE),
            Self::Unsubscribe => Some(&*UNSUBSCRIBE_ROUTE),
            Self::Publish => None,
        }
    }

    /// Command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish => "publish",
        }
    }

    /// Run the command against borrowed collaborators.
    ///
    /// `protocol` is the variant the session is talking over. Only connect
    /// suspends, and only for the negotiated long-poll window or until
    /// `cancel` fires.
    pub async fn process(
        self,
        protocol: &dyn Protocol,
        server: &dyn Server,
        session: &dyn Session,
        request: &Message,
        cancel: &CancellationToken,
    ) -> Packet {
        match self {
            Self::Handshake => handshake::process(protocol, server, session, request),
            Self::Connect => connect::process(protocol, session, request, cancel).await,
            Self::Disconnect => disconnect::process(session, request),
            Self::Subscribe => subscription::subscribe(server, session, request),
            Self::Unsubscribe => subscription::unsubscribe(server, session, request),
            Self::Publish => publish::process(server, session, request),
        }
    }
}

impl fmt::Display for MetaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Route a request and run it.
pub async fn dispatch(
    protocol: &dyn Protocol,
    server: &dyn Server,
    session: &dyn Session,
    request: &Message,
    cancel: &CancellationToken,
) -> Result<Packet> {
    let command = MetaCommand::from_path(request.channel()).inspect_err(|e| {
        warn!(session = session.id(), channel = ?request.channel(), "Routing failed: {e}");
    })?;

    let packet = command
        .process(protocol, server, session, request, cancel)
        .await;

    debug!(
        session = session.id(),
        command = command.name(),
        successful = packet.first().is_some_and(Message::is_successful),
        messages = packet.messages.len(),
        "Processed {command}"
    );

    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_meta_commands() {
        assert_eq!(
            MetaCommand::from_path(Some("/meta/handshake")).unwrap(),
            MetaCommand::Handshake
        );
        assert_eq!(
            MetaCommand::from_path(Some("/meta/connect")).unwrap(),
            MetaCommand::Connect
        );
        assert_eq!(
            MetaCommand::from_path(Some("/meta/disconnect")).unwrap(),
            MetaCommand::Disconnect
        );
        assert_eq!(
            MetaCommand::from_path(Some("/meta/subscribe")).unwrap(),
            MetaCommand::Subscribe
        );
        assert_eq!(
            MetaCommand::from_path(Some("/meta/unsubscribe")).unwrap(),
            MetaCommand::Unsubscribe
        );
    }

    #[test]
    fn test_from_path_publish() {
        assert_eq!(
            MetaCommand::from_path(Some("/anything/else")).unwrap(),
            MetaCommand::Publish
        );
        // not under the reserved prefix
        assert_eq!(
            MetaCommand::from_path(Some("/metadata")).unwrap(),
            MetaCommand::Publish
        );
    }

    #[test]
    fn test_from_path_routing_errors() {
        let err = MetaCommand::from_path(None).unwrap_err();
        assert!(err.is_routing());
        assert_eq!(err.to_string(), "All messages require a channel attribute");

        let err = MetaCommand::from_path(Some("/meta/bogus")).unwrap_err();
        assert_eq!(err.to_string(), "Attempt to publish to a meta channel");

        // exact match only
        assert!(MetaCommand::from_path(Some("/meta/handshake/")).is_err());
    }

    #[test]
    fn test_routes() {
        assert_eq!(
            MetaCommand::Subscribe.route().map(Route::path),
            Some("/meta/subscribe")
        );
        assert!(MetaCommand::Publish.route().is_none());
        assert_eq!(MetaCommand::Connect.to_string(), "connect");
    }
}
