//! HTTP API server for the deck front-end

pub mod assistant;
pub mod dashboard;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::AssistantHandle;
use crate::clock::ClockReading;
use crate::config::ServerConfig;
use crate::environment::SnapshotReader;
use crate::inference::EngineStatus;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Latest clock labels
    pub clock: watch::Receiver<ClockReading>,
    /// Latest weather reading
    pub snapshot: SnapshotReader,
    /// Inference engine readiness
    pub engine: watch::Receiver<EngineStatus>,
    /// Voice assistant
    pub assistant: AssistantHandle,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, config: &ServerConfig) -> Self {
        Self {
            state: Arc::new(state),
            port: config.port,
            static_dir: config.static_dir.clone(),
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/assistant", assistant::router(self.state.clone()))
            .nest("/api", dashboard::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        // Serve the dashboard page if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // The kiosk page may be served from another origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
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
