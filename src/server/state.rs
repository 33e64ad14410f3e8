//! Server state and per-request session resolution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::Session;
use crate::config::Config;
use crate::error::{BayeuxError, Result};
use crate::memory::{MemoryServer, MemorySession, TransportProtocol};
use crate::meta;
use crate::protocol::message::CHANNEL;
use crate::protocol::{error_response, Message, SessionState, HANDSHAKE_ROUTE};

/// Application state shared across handlers
pub struct AppState {
    /// Full configuration
    pub config: Config,
    /// Session and channel registries
    pub server: MemoryServer,
    /// Protocol served over HTTP
    pub protocol: Arc<TransportProtocol>,
    /// Cancelled on shutdown; every long-poll waits on a child token
    pub shutdown: CancellationToken,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let server = MemoryServer::from_config(&config);
        let protocol = server.long_polling_protocol().ok_or_else(|| {
            BayeuxError::Config("The HTTP endpoint requires a long-polling protocol".to_string())
        })?;

        Ok(Self {
            config,
            server,
            protocol,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        })
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Process one inbound message and return the messages to send back.
    ///
    /// Routing failures are turned into a single error reply here, since no
    /// operation ever ran to produce one.
    pub async fn process(&self, request: Message) -> Vec<Message> {
        let handshake = request.channel() == Some(HANDSHAKE_ROUTE.path());
        let session = self.resolve_session(&request, handshake);
        // Keeps the reaper off the session while a connect is held open
        let _in_flight = session.begin_request();

        let cancel = self.shutdown.child_token();
        let result = meta::dispatch(&*self.protocol, &self.server, &*session, &request, &cancel).await;

        match result {
            Ok(packet) => {
                let refused = !packet.first().is_some_and(Message::is_successful);
                if (handshake && refused) || session.state() == SessionState::Disconnected {
                    self.server.remove_session(session.id());
                }
                packet.messages
            }
            Err(e) => vec![routing_error(&request, &e)],
        }
    }

    /// Handshakes get a fresh registered session. Anything else runs against
    /// the session it names, or a throwaway one when the id is unknown.
    fn resolve_session(&self, request: &Message, handshake: bool) -> Arc<MemorySession> {
        if handshake {
            return self.server.create_session();
        }

        request
            .session_id()
            .and_then(|id| self.server.session(id))
            .unwrap_or_else(|| {
                debug!(client_id = ?request.session_id(), "Unknown session");
                self.server.transient_session()
            })
    }

    /// Periodically remove idle sessions until shutdown
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let period = Duration::from_millis(state.config.bayeux.reap_interval_ms.max(1));
        let max_idle = Duration::from_millis(state.config.bayeux.session_idle_timeout_ms);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = state.shutdown.cancelled() => {
                        info!("Session reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        state.server.reap_idle(max_idle);
                    }
                }
            }
        })
    }
}

fn routing_error(request: &Message, error: &BayeuxError) -> Message {
    error_response(
        request.get(CHANNEL).cloned().unwrap_or(Value::Null),
        request,
        request.session_id(),
        &error.to_string(),
        None,
    )
}
