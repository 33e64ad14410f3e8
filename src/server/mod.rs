//! Bayeux HTTP long-polling server.
//!
//! Exposes the engine over HTTP:
//! - `POST <path>` (default `/cometd`): Bayeux messages, single or batched
//! - `GET /health`: liveness and registry counts
//!
//! # Example
//!
//! ```rust,ignore
//! use bayeux::config::Config;
//! use bayeux::server::HttpServer;
//!
//! let server = HttpServer::new(Config::default())?;
//! let shutdown = server.shutdown_token();
//! server.run().await?;
//! ```

mod handlers;
mod state;

pub use handlers::{create_router, health_check, HealthResponse};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{BayeuxError, Result};

/// HTTP front end for a [`crate::memory::MemoryServer`]
pub struct HttpServer {
    state: Arc<AppState>,
}

impl HttpServer {
    /// Build the server from configuration
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    /// Shared state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Token that stops the server, the reaper and all pending long-polls
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Router with tracing, body limit and optional CORS layers
    pub fn router(&self) -> Router {
        let http = &self.state.config.server;

        let router = create_router(self.state())
            .layer(RequestBodyLimitLayer::new(http.max_body_size))
            .layer(TraceLayer::new_for_http());

        if http.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.server.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| BayeuxError::Server(format!("Failed to bind {addr}: {e}")))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        let router = self.router();
        let reaper = self.state.spawn_reaper();
        let shutdown = self.shutdown_token();

        info!(
            "Bayeux endpoint listening on http://{}{}",
            addr, self.state.config.server.path
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| BayeuxError::Server(format!("HTTP server error: {e}")))?;

        reaper.abort();
        info!("Bayeux endpoint stopped");
        Ok(())
    }
}
