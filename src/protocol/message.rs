//! Bayeux message documents.
//!
//! A [`Message`] is an ordered JSON object. Requests arrive as whatever the
//! client sent; responses are assembled by [`ResponseBuilder`](super::ResponseBuilder)
//! and keep their fields in insertion order on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::advice;

/// `channel` field
pub const CHANNEL: &str = "channel";
/// `id` field
pub const ID: &str = "id";
/// Session identifier field (`clientId` on the wire)
pub const SESSION_ID: &str = "clientId";
/// `successful` field
pub const SUCCESSFUL: &str = "successful";
/// `error` field
pub const ERROR: &str = "error";
/// `advice` field
pub const ADVICE: &str = "advice";
/// `data` field
pub const DATA: &str = "data";
/// `subscription` field
pub const SUBSCRIPTION: &str = "subscription";
/// `version` field
pub const VERSION: &str = "version";
/// `minimumVersion` field
pub const MINIMUM_VERSION: &str = "minimumVersion";
/// `supportedConnectionTypes` field
pub const SUPPORTED_CONNECTION_TYPES: &str = "supportedConnectionTypes";
/// `connectionType` field
pub const CONNECTION_TYPE: &str = "connectionType";
/// `ext` field
pub const EXT: &str = "ext";

/// Ordered Bayeux message document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    fields: Map<String, Value>,
}

impl Message {
    /// Create an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, keeping its original position if present
    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Raw field access
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the field is present (even if `null`)
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// String-typed field, `None` if absent or not a string
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// `channel` as a string
    pub fn channel(&self) -> Option<&str> {
        self.get_str(CHANNEL)
    }

    /// `id` as a string
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID)
    }

    /// `clientId` as a string
    pub fn session_id(&self) -> Option<&str> {
        self.get_str(SESSION_ID)
    }

    /// `subscription` as a string
    pub fn subscription(&self) -> Option<&str> {
        self.get_str(SUBSCRIPTION)
    }

    /// `connectionType` as a string
    pub fn connection_type(&self) -> Option<&str> {
        self.get_str(CONNECTION_TYPE)
    }

    /// `error` as a string
    pub fn error(&self) -> Option<&str> {
        self.get_str(ERROR)
    }

    /// `data`, any type
    pub fn data(&self) -> Option<&Value> {
        self.fields.get(DATA)
    }

    /// `successful` is present and true
    pub fn is_successful(&self) -> bool {
        self.fields.get(SUCCESSFUL).and_then(Value::as_bool) == Some(true)
    }

    /// `advice` object, if present and an object
    pub fn advice(&self) -> Option<&Map<String, Value>> {
        self.fields.get(ADVICE).and_then(Value::as_object)
    }

    /// Numeric `advice.<field>` as milliseconds
    pub fn advice_millis(&self, field: &str) -> Option<i64> {
        self.advice()?.get(field).and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_u64().map(|n| i64::try_from(n).unwrap_or(i64::MAX)))
                .or_else(|| value.as_f64().map(|n| n as i64))
        })
    }

    /// `advice.reconnect` code
    pub fn reconnect(&self) -> Option<&str> {
        self.advice()?.get(advice::RECONNECT).and_then(Value::as_str)
    }

    /// String entries of `supportedConnectionTypes`; non-string entries are skipped
    pub fn supported_connection_types(&self) -> Vec<&str> {
        self.fields
            .get(SUPPORTED_CONNECTION_TYPES)
            .and_then(Value::as_array)
            .map(|types| types.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Convert to a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
