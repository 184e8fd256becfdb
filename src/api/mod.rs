//! HTTP API server for the kiosk gateway

pub mod health;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::session::Orchestrator;
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for the given orchestrator and port
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, port: u16) -> Self {
        Self {
            state: Arc::new(ApiState { orchestrator }),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        // CORS open to any origin: the avatar frontend is served elsewhere
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(websocket::router(Arc::clone(&self.state)))
            .merge(health::router())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
