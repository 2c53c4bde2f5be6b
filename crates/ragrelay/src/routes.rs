//! The /api route handlers.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragrelay_local::openai_compat::SummaryClient;
use ragrelay_local::{pipeline, session};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK", "message": "ragrelay API is running" }))
}

#[derive(Debug, Deserialize)]
pub struct ProcessPaperRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default, rename = "maxResults")]
    max_results: Option<usize>,
}

pub async fn process_paper(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessPaperRequest>,
) -> Response {
    let Some(query) = req
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Query parameter is required" })),
        )
            .into_response();
    };
    let max_results = req.max_results.unwrap_or(1);

    tracing::info!(query, max_results, "processing paper query");

    let llm = match SummaryClient::from_env(state.http.clone()) {
        Ok(llm) => llm,
        Err(e) => return process_paper_error(&e),
    };
    match pipeline::search_and_summarize(&state.http, &llm, query, max_results, &state.retry).await
    {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "process-paper failed");
            process_paper_error(&e)
        }
    }
}

fn process_paper_error(e: &ragrelay_core::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to process paper", "message": e.to_string() })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pdf_url: Option<String>,
}

pub async fn create_rag_session_from_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let Some(pdf_url) = req
        .pdf_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "pdf_url parameter is required" })),
        )
            .into_response();
    };

    match session::create_session_from_url(&state.http, &state.fastapi_url, pdf_url).await {
        Ok(session_id) => Json(json!({ "session_id": session_id })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "create_rag_session_from_url failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Always 200: a never-seen session id reads as empty progress, never 404.
pub async fn rag_progress(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let progress = state.sessions.get(&session_id).await.unwrap_or_default();
    Json(json!({ "progress": progress }))
}
