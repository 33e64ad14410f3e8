//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::state::AppState;
use crate::protocol::Message;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let path = state.config.server.path.clone();

    Router::new()
        // Health and status
        .route("/health", get(health_check))
        // Bayeux messages
        .route(&path, post(handle_messages))
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the endpoint answers
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Advertised Bayeux protocol version
    pub bayeux_version: String,
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Registered sessions
    pub sessions: usize,
    /// Known channels
    pub channels: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        bayeux_version: state.config.bayeux.version.clone(),
        uptime_secs: state.uptime().as_secs(),
        sessions: state.server.session_count(),
        channels: state.server.channel_count(),
    })
}

/// Bayeux endpoint. Accepts one message or an array of them and answers
/// with an array, processing messages in order.
async fn handle_messages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(requests) = parse_batch(body) else {
        warn!("Rejected request body that is not a message or message array");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Expected a message object or an array of messages"})),
        );
    };

    let mut replies = Vec::with_capacity(requests.len());
    for request in requests {
        replies.extend(state.process(request).await.into_iter().map(Message::into_value));
    }

    (StatusCode::OK, Json(Value::Array(replies)))
}

fn parse_batch(body: Value) -> Option<Vec<Message>> {
    match body {
        Value::Array(items) => items.into_iter().map(Message::from_value).collect(),
        object @ Value::Object(_) => Message::from_value(object).map(|m| vec![m]),
        _ => None,
    }
}
