//! In-process collaborators.
//!
//! [`MemoryServer`] keeps sessions and channels in concurrent registries and
//! fans deliveries out to every channel whose route matches, wildcards
//! included:
//!
//! ```text
//! publish /foo/bar ──► deliver() ──┬─► /foo/bar subscribers
//!                                  ├─► /foo/*   subscribers
//!                                  └─► /**      subscribers
//! ```
//!
//! A session subscribed through several matching channels receives the
//! packet once.

mod channel;
mod protocol;
mod session;

pub use channel::MemoryChannel;
pub use protocol::TransportProtocol;
pub use session::{InFlight, MemorySession};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::api::{Channel, Protocol, SecurityPolicy, Server, Session};
use crate::config::{BayeuxConfig, Config, ProtocolConfig};
use crate::protocol::{Packet, PathError, Route};

/// Server with in-memory session and channel registries
pub struct MemoryServer {
    version: String,
    minimum_version: String,
    max_queue_size: usize,
    sessions: DashMap<String, Arc<MemorySession>>,
    channels: DashMap<String, Arc<MemoryChannel>>,
    protocols: Vec<Arc<TransportProtocol>>,
    policy: Option<Box<dyn SecurityPolicy>>,
}

impl MemoryServer {
    /// Create a server hosting the given protocols, in registration order
    pub fn new(config: &BayeuxConfig, protocols: &[ProtocolConfig]) -> Self {
        Self {
            version: config.version.clone(),
            minimum_version: config.minimum_version.clone(),
            max_queue_size: config.max_queue_size,
            sessions: DashMap::new(),
            channels: DashMap::new(),
            protocols: protocols
                .iter()
                .map(|p| Arc::new(TransportProtocol::from(p)))
                .collect(),
            policy: None,
        }
    }

    /// Create a server from a full configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.bayeux, &config.protocols)
    }

    /// Install a security policy
    pub fn with_security_policy(mut self, policy: impl SecurityPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Create and register a session
    pub fn create_session(&self) -> Arc<MemorySession> {
        let session = Arc::new(MemorySession::new(self.max_queue_size));
        self.sessions
            .insert(session.id().to_string(), session.clone());
        debug!(session = session.id(), "Session created");
        session
    }

    /// Session that is never registered. Requests naming an unknown id run
    /// against one so they fail the session checks.
    pub fn transient_session(&self) -> Arc<MemorySession> {
        Arc::new(MemorySession::new(self.max_queue_size))
    }

    /// Registered session by id
    pub fn session(&self, id: &str) -> Option<Arc<MemorySession>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Unregister a session, unsubscribe it everywhere and disconnect it
    pub fn remove_session(&self, id: &str) -> Option<Arc<MemorySession>> {
        let (_, session) = self.sessions.remove(id)?;
        self.retire(id, &session);
        Some(session)
    }

    fn retire(&self, id: &str, session: &MemorySession) {
        // Disconnect before cleanup so a racing subscribe either sees the
        // terminal state or has its entry swept below
        session.complete_disconnect();
        for channel in &self.channels {
            channel.remove_subscriber(id);
        }

        debug!(session = id, "Session removed");
    }

    /// Remove sessions idle for longer than `max_idle`. Sessions with a
    /// request in flight, such as a held connect, are skipped. Returns how many.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_idle(max_idle))
            .map(|entry| entry.key().clone())
            .collect();

        // Re-checked under the entry lock in case a request began meanwhile
        let mut reaped = 0;
        for id in &idle {
            if let Some((id, session)) = self.sessions.remove_if(id, |_, s| s.is_idle(max_idle)) {
                self.retire(&id, &session);
                reaped += 1;
            }
        }

        if reaped > 0 {
            info!("Reaped {reaped} idle sessions");
        }
        reaped
    }

    /// Number of registered sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Registered channel by path
    pub fn channel(&self, path: &str) -> Option<Arc<MemoryChannel>> {
        self.channels.get(path).map(|entry| entry.value().clone())
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Close a channel. Returns `false` if it does not exist.
    pub fn close_channel(&self, path: &str) -> bool {
        match self.channel(path) {
            Some(channel) => {
                channel.close();
                true
            }
            None => false,
        }
    }

    /// Concrete protocol by name
    pub fn protocol_by_name(&self, name: &str) -> Option<Arc<TransportProtocol>> {
        self.protocols.iter().find(|p| p.name() == name).cloned()
    }

    /// First registered long-polling protocol
    pub fn long_polling_protocol(&self) -> Option<Arc<TransportProtocol>> {
        self.protocols.iter().find(|p| p.is_long_polling()).cloned()
    }

    /// Ids of sessions subscribed to any channel matching `route`
    fn recipients(&self, route: &Route) -> HashSet<String> {
        self.channels
            .iter()
            .filter(|entry| entry.value().route().matches(route))
            .flat_map(|entry| entry.value().subscribers())
            .collect()
    }
}

impl Server for MemoryServer {
    fn security_policy(&self) -> Option<&dyn SecurityPolicy> {
        self.policy.as_deref()
    }

    fn bayeux_version(&self) -> &str {
        &self.version
    }

    fn minimum_bayeux_version(&self) -> &str {
        &self.minimum_version
    }

    fn find_channel(&self, path: &str) -> Result<Option<Arc<dyn Channel>>, PathError> {
        let route = Route::parse(path)?;
        Ok(self
            .channel(route.path())
            .map(|channel| channel as Arc<dyn Channel>))
    }

    fn require_channel(&self, path: &str) -> Result<Arc<dyn Channel>, PathError> {
        let route = Route::parse(path)?;
        let channel: Arc<dyn Channel> = self
            .channels
            .entry(route.path().to_string())
            .or_insert_with(|| {
                debug!(channel = path, "Channel created");
                Arc::new(MemoryChannel::new(route))
            })
            .value()
            .clone();
        Ok(channel)
    }

    fn deliver(&self, sender: &dyn Session, packet: Packet) {
        let Some(route) = packet.route.clone() else {
            return;
        };

        let recipients = self.recipients(&route);
        trace!(
            sender = sender.id(),
            channel = route.path(),
            recipients = recipients.len(),
            "Delivering"
        );

        for id in recipients {
            if let Some(session) = self.session(&id) {
                session.enqueue(packet.clone());
            }
        }
    }

    fn protocol_names(&self) -> Vec<String> {
        self.protocols.iter().map(|p| p.name().to_string()).collect()
    }

    fn protocol(&self, name: &str) -> Option<Arc<dyn Protocol>> {
        self.protocol_by_name(name)
            .map(|protocol| protocol as Arc<dyn Protocol>)
    }
}
