//! Shared state and router assembly.

use crate::{relay, routes};
use axum::routing::{any, get, post};
use axum::Router;
use ragrelay_core::SessionStore;
use ragrelay_local::fetch::RetryPolicy;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Fallback when `FASTAPI_URL` is unset: a FastAPI dev server's canonical
/// local bind.
pub const DEFAULT_FASTAPI_URL: &str = "http://127.0.0.1:8000";

pub struct AppState {
    /// Shared outbound client; carries the relay's fixed User-Agent.
    pub http: reqwest::Client,
    /// Base URL of the external RAG backend (no trailing path).
    pub fastapi_url: String,
    pub retry: RetryPolicy,
    /// Injected progress store; the relay write-through populates it from
    /// proxied progress responses.
    pub sessions: Arc<dyn SessionStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/process-paper", post(routes::process_paper))
        .route(
            "/api/create_rag_session_from_url",
            post(routes::create_rag_session_from_url),
        )
        .route("/api/rag_progress/:session_id", get(routes::rag_progress))
        .route("/chatbot/*path", any(relay::relay_chatbot))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
