//! HTTP API server for the web front-end

pub mod chat;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::Assistant;
use crate::brain::CommandRouter;
use crate::voice::Synthesizer;

/// URL path the static directory is mounted at
pub const STATIC_URL_PREFIX: &str = "/static";

/// URL path generated reply audio is served from
pub const AUDIO_URL_PREFIX: &str = "/static/audio";

/// Bundled chat page
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub assistant: Assistant,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
    /// Where generated reply audio is written
    pub audio_dir: PathBuf,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    router: CommandRouter,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    host: String,
    port: u16,
    static_dir: PathBuf,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(router: CommandRouter) -> Self {
        Self {
            router,
            synthesizer: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }

    /// Set the synthesizer used to voice replies
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Option<Arc<dyn Synthesizer>>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Set the bind address
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the static files directory; reply audio goes in its `audio` subdirectory
    #[must_use]
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Set host, port, static dir from `ServerConfig`
    #[must_use]
    pub fn server_config(self, config: &crate::config::ServerConfig) -> Self {
        self.host(config.host.clone())
            .port(config.port)
            .static_dir(config.static_dir.clone())
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            assistant: Assistant::new(self.router, None),
            synthesizer: self.synthesizer,
            audio_dir: self.static_dir.join("audio"),
        });

        ApiServer {
            state,
            host: self.host,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: PathBuf,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/", get(index))
            .nest("/api", chat::router(self.state.clone()))
            .merge(health::router())
            .nest_service(STATIC_URL_PREFIX, ServeDir::new(&self.static_dir));

        // CORS layer for cross-origin requests from frontend
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
        if self.state.synthesizer.is_none() {
            tracing::warn!("speech synthesis unavailable, replies will be text only");
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.state.audio_dir).await {
            tracing::warn!(path = %self.state.audio_dir.display(), error = %e, "cannot create audio directory");
        }

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(addr = %addr, static_dir = %self.static_dir.display(), "API server listening");

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

/// Serve the bundled chat page
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
