//! HTTP API server for the voice tutor

mod auth;
pub mod chat;
pub mod health;
pub mod notes;
pub mod rate_limit;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::{middleware, Router};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::agent::TutorAgent;
use crate::config::VoiceConfig;
use crate::notes::NotesStore;
use crate::speech::DEFAULT_CHUNK_CHARS;
use crate::voice::SpeechSynthesizer;
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<TutorAgent>,
    /// Speech synthesizer; `None` when no TTS backend is configured
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub notes: NotesStore,
    pub api_key: Option<SecretString>,
    /// Character threshold for streamed speech chunks
    pub chunk_chars: usize,
    /// Chunks synthesized at once when streaming
    pub tts_concurrency: usize,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    agent: Arc<TutorAgent>,
    port: u16,
    tts: Option<Arc<dyn SpeechSynthesizer>>,
    api_key: Option<SecretString>,
    static_dir: Option<PathBuf>,
    chunk_chars: usize,
    tts_concurrency: usize,
    rate_limit_per_minute: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(agent: Arc<TutorAgent>, port: u16) -> Self {
        Self {
            agent,
            port,
            tts: None,
            api_key: None,
            static_dir: None,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            tts_concurrency: 4,
            rate_limit_per_minute: None,
        }
    }

    /// Set the speech synthesizer
    #[must_use]
    pub fn tts(mut self, tts: Arc<dyn SpeechSynthesizer>) -> Self {
        self.tts = Some(tts);
        self
    }

    /// Require this bearer key on `/api/*`
    #[must_use]
    pub fn api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Set the static files directory for serving the web client
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Set chunking options from `VoiceConfig`
    #[must_use]
    pub fn voice_config(mut self, config: &VoiceConfig) -> Self {
        self.chunk_chars = config.chunk_chars;
        self.tts_concurrency = config.concurrency;
        self
    }

    /// Limit the whole API to this many requests per minute
    #[must_use]
    pub fn rate_limit(mut self, per_minute: Option<u32>) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let notes = self.agent.notes().clone();
        let rate_limiter = self.rate_limit_per_minute.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            agent: self.agent,
            tts: self.tts,
            notes,
            api_key: self.api_key,
            chunk_chars: self.chunk_chars,
            tts_concurrency: self.tts_concurrency,
            rate_limiter,
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
    /// Shared handler state
    #[must_use]
    pub const fn state(&self) -> &Arc<ApiState> {
        &self.state
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/chat", chat::router(self.state.clone()))
            .nest("/api/tts", voice::router(self.state.clone()))
            .nest("/api/notes", notes::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let router = router.layer(middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from a separately hosted client
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(voice::CHUNK_COUNT_HEADER)]);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until Ctrl-C
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
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutting down");
                }
            })
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
