//! Protocol variants built from configuration.

use crate::api::Protocol;
use crate::config::ProtocolConfig;

/// A configured transport family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProtocol {
    name: String,
    transport_names: Vec<String>,
    long_polling: bool,
    long_poll_timeout_ms: i64,
    long_poll_interval_ms: i64,
}

impl From<&ProtocolConfig> for TransportProtocol {
    fn from(config: &ProtocolConfig) -> Self {
        Self {
            name: config.name.clone(),
            transport_names: config.transport_names.clone(),
            long_polling: config.long_polling,
            long_poll_timeout_ms: config.long_poll_timeout_ms,
            long_poll_interval_ms: config.long_poll_interval_ms,
        }
    }
}

impl Protocol for TransportProtocol {
    fn name(&self) -> &str {
        &self.name
    }

    fn transport_names(&self) -> &[String] {
        &self.transport_names
    }

    fn is_long_polling(&self) -> bool {
        self.long_polling
    }

    fn long_poll_timeout_ms(&self) -> i64 {
        self.long_poll_timeout_ms
    }

    fn long_poll_interval_ms(&self) -> i64 {
        self.long_poll_interval_ms
    }
}
