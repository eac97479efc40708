//! REST surface of the relay.
//!
//! Every route answers with an [`ApiResponse`] envelope.

pub mod envelope;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::client::OllamaClient;
use crate::config::RelayConfig;
use crate::whisper::WhisperClient;

pub use envelope::{ApiError, ApiResponse, ApiResult};

/// Images and audio arrive inline, so allow much more than axum's 2 MB default.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub ollama: OllamaClient,
    pub whisper: WhisperClient,
}

impl AppState {
    pub fn new(ollama: OllamaClient, whisper: WhisperClient) -> Self {
        Self { ollama, whisper }
    }

    /// Build both upstream clients on one shared connection pool.
    pub fn from_config(config: &RelayConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            ollama: OllamaClient::with_http_client(http.clone(), config.ollama.clone()),
            whisper: WhisperClient::with_http_client(http, config.whisper.clone()),
        }
    }
}

/// Full application router with CORS, tracing and body limits applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/ollama", ollama_router())
        .nest("/api/whisper", whisper_router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn ollama_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/chat-with-image", post(handlers::chat_with_image))
        .route("/health", get(handlers::ollama_health))
}

fn whisper_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recognize", post(handlers::recognize))
        .route("/recognize-file", post(handlers::recognize_file))
        .route("/health", get(handlers::whisper_health))
}
