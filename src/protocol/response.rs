//! Response assembly.
//!
//! Every response starts with `channel`, `id` and `clientId`, followed by
//! `successful` and, for failures, `error`. Advice is attached only when the
//! operation calls for it.

use serde_json::{Map, Value};

use super::advice::{self, Reconnect};
use super::message::{self, Message};

/// Builder for response messages
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    message: Message,
}

impl ResponseBuilder {
    /// Start a response on `channel`, echoing the request `id` and the given
    /// session id. Absent values are written as `null`.
    pub fn new(channel: impl Into<Value>, request: &Message, session_id: Option<&str>) -> Self {
        let message = Message::new()
            .with(message::CHANNEL, channel)
            .with(
                message::ID,
                request.get(message::ID).cloned().unwrap_or(Value::Null),
            )
            .with(
                message::SESSION_ID,
                session_id.map_or(Value::Null, Value::from),
            );

        Self { message }
    }

    /// Mark successful
    pub fn success(mut self) -> Self {
        self.message.insert(message::SUCCESSFUL, true);
        self
    }

    /// Mark failed with a human-readable error
    pub fn failure(mut self, error: &str) -> Self {
        self.message.insert(message::SUCCESSFUL, false);
        self.message.insert(message::ERROR, error);
        self
    }

    /// Attach `advice.reconnect` when a hint is given
    pub fn reconnect(self, reconnect: Option<Reconnect>) -> Self {
        match reconnect {
            Some(reconnect) => self.advice(advice::RECONNECT, reconnect.code()),
            None => self,
        }
    }

    /// Attach `advice.interval`
    pub fn interval(self, interval_ms: i64) -> Self {
        self.advice(advice::INTERVAL, interval_ms)
    }

    /// Set an arbitrary field
    pub fn field(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.message.insert(field, value);
        self
    }

    /// Finish
    pub fn build(self) -> Message {
        self.message
    }

    fn advice(mut self, field: &str, value: impl Into<Value>) -> Self {
        let mut advice = self
            .message
            .advice()
            .cloned()
            .unwrap_or_else(Map::new);
        advice.insert(field.to_string(), value.into());
        self.message.insert(message::ADVICE, Value::Object(advice));
        self
    }
}

/// `successful: true` response with an optional reconnect hint
pub fn success_response(
    channel: &str,
    request: &Message,
    session_id: Option<&str>,
    reconnect: Option<Reconnect>,
) -> Message {
    ResponseBuilder::new(channel, request, session_id)
        .success()
        .reconnect(reconnect)
        .build()
}

/// `successful: false` response with an error and an optional reconnect hint
pub fn error_response(
    channel: impl Into<Value>,
    request: &Message,
    session_id: Option<&str>,
    error: &str,
    reconnect: Option<Reconnect>,
) -> Message {
    ResponseBuilder::new(channel, request, session_id)
        .failure(error)
        .reconnect(reconnect)
        .build()
}
