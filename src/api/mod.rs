//! HTTP and WebSocket API
//!
//! Serves the text endpoint, the robot event gateway and, when configured,
//! the browser front end.

pub mod health;
pub mod process;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::responder::ResponseGenerator;
use crate::robot::RobotRuntime;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub runtime: Arc<RobotRuntime>,
    pub responder: Arc<ResponseGenerator>,
    pub voice_enabled: bool,
}

/// Builder for the API server
pub struct ApiServerBuilder {
    runtime: Arc<RobotRuntime>,
    responder: Arc<ResponseGenerator>,
    port: u16,
    static_dir: Option<PathBuf>,
    voice_enabled: bool,
}

impl ApiServerBuilder {
    #[must_use]
    pub fn new(runtime: Arc<RobotRuntime>, responder: Arc<ResponseGenerator>, port: u16) -> Self {
        Self {
            runtime,
            responder,
            port,
            static_dir: None,
            voice_enabled: false,
        }
    }

    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    #[must_use]
    pub const fn voice_enabled(mut self, enabled: bool) -> Self {
        self.voice_enabled = enabled;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            runtime: self.runtime,
            responder: self.responder,
            voice_enabled: self.voice_enabled,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(process::router(Arc::clone(&self.state)))
            .merge(websocket::router(Arc::clone(&self.state)))
            .merge(health::router(Arc::clone(&self.state)));

        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

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

    /// Spawn the API server as a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
