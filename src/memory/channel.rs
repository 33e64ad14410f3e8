//! In-process channel.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tracing::debug;

use crate::api::{Channel, Session};
use crate::protocol::Route;

/// Channel holding the ids of its subscribers
#[derive(Debug)]
pub struct MemoryChannel {
    route: Route,
    subscribers: DashSet<String>,
    closed: AtomicBool,
}

impl MemoryChannel {
    /// Create an open channel with no subscribers
    pub fn new(route: Route) -> Self {
        Self {
            route,
            subscribers: DashSet::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Refuse further subscriptions. Existing subscribers stay.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(channel = self.route.path(), "Channel closed");
        }
    }

    /// Whether `session_id` is subscribed
    pub fn is_subscribed(&self, session_id: &str) -> bool {
        self.subscribers.contains(session_id)
    }

    /// Number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Snapshot of subscriber ids
    pub fn subscribers(&self) -> Vec<String> {
        self.subscribers.iter().map(|id| id.key().clone()).collect()
    }

    /// Drop a subscriber by id
    pub fn remove_subscriber(&self, session_id: &str) -> bool {
        self.subscribers.remove(session_id).is_some()
    }
}

impl Channel for MemoryChannel {
    fn route(&self) -> &Route {
        &self.route
    }

    fn subscribe(&self, session: &dyn Session) -> bool {
        if self.is_closed() {
            return false;
        }
        if self.subscribers.insert(session.id().to_string()) {
            debug!(channel = self.route.path(), session = session.id(), "Subscribed");
        }
        true
    }

    fn unsubscribe(&self, session: &dyn Session) {
        if self.remove_subscriber(session.id()) {
            debug!(channel = self.route.path(), session = session.id(), "Unsubscribed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySession;

    fn channel(path: &str) -> MemoryChannel {
        MemoryChannel::new(Route::parse(path).unwrap())
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let channel = channel("/foo");
        let session = MemorySession::new(4);

        assert!(channel.subscribe(&session));
        assert!(channel.subscribe(&session));
        assert_eq!(channel.subscriber_count(), 1);
        assert!(channel.is_subscribed(session.id()));

        channel.unsubscribe(&session);
        channel.unsubscribe(&session);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_closed_channel_refuses() {
        let channel = channel("/foo");
        let early = MemorySession::new(4);
        let late = MemorySession::new(4);

        assert!(channel.subscribe(&early));
        channel.close();

        assert!(channel.is_closed());
        assert!(!channel.subscribe(&late));
        assert_eq!(channel.subscribers(), vec![early.id().to_string()]);
    }
}
