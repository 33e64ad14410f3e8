//! Bayeux engine error types.
//!
//! # Error Classification
//!
//! Most protocol failures never show up here. Precondition violations
//! (handshake/connection/transport/meta-guard), authorization vetoes and
//! malformed subscription paths are all resolved into ordinary response
//! messages carrying `successful: false`.
//!
//! What remains are failures that happen before any session or route context
//! exists, plus the ambient failures of the surrounding server:
//!
//! - **Routing**: the inbound message has no `channel` attribute, or names a
//!   `/meta/` channel that is not one of the five commands. The transport
//!   catches these and degrades them into a best-effort error reply.
//! - **InvalidPath**: a channel path that failed validation, surfaced by the
//!   channel registry.
//! - **Config / Server / Json / Io**: everything around the engine.

use thiserror::Error;

use crate::protocol::PathError;

/// Bayeux engine errors.
#[derive(Error, Debug)]
pub enum BayeuxError {
    /// Message could not be routed to any meta command.
    #[error("{0}")]
    Routing(String),

    /// Channel path failed validation.
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Server-side error.
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Bayeux operations
pub type Result<T> = std::result::Result<T, BayeuxError>;

impl BayeuxError {
    /// Routing failure for a message without a `channel` attribute.
    pub fn missing_channel() -> Self {
        BayeuxError::Routing("All messages require a channel attribute".to_string())
    }

    /// Routing failure for an unrecognized `/meta/` channel.
    pub fn meta_publish() -> Self {
        BayeuxError::Routing("Attempt to publish to a meta channel".to_string())
    }

    /// Whether this is a routing-level failure.
    pub fn is_routing(&self) -> bool {
        matches!(self, BayeuxError::Routing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_messages_are_verbatim() {
        assert_eq!(
            BayeuxError::missing_channel().to_string(),
            "All messages require a channel attribute"
        );
        assert_eq!(
            BayeuxError::meta_publish().to_string(),
            "Attempt to publish to a meta channel"
        );
        assert!(BayeuxError::meta_publish().is_routing());
        assert!(!BayeuxError::Config("x".to_string()).is_routing());
    }
}
