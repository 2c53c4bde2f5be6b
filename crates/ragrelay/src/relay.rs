//! The /chatbot catch-all: multipart re-encoding and the generic relay.
//!
//! The relay never interprets chatbot payloads; it forwards them to
//! `FASTAPI_URL + originalPath` and mirrors the response status and body
//! type (JSON re-serialized, anything else passed through as text).

use crate::server::AppState;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragrelay_core::{Error, Result};
use serde_json::json;
use std::sync::Arc;

pub async fn relay_chatbot(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let method = req.method().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let result = if content_type.starts_with("multipart/form-data") {
        match Multipart::from_request(req, &()).await {
            Ok(multipart) => proxy_multipart(&state, method, &path_and_query, multipart).await,
            Err(e) => Err(Error::InvalidRequest(e.to_string())),
        }
    } else {
        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                relay_plain(&state, method, &path_and_query, &parts.headers, &bytes).await
            }
            Err(e) => Err(Error::InvalidRequest(e.to_string())),
        }
    };

    match result {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, path = %path_and_query, "chatbot relay failed");
            let status = match &e {
                Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

fn upstream_url(state: &AppState, path_and_query: &str) -> String {
    format!(
        "{}{}",
        state.fastapi_url.trim_end_matches('/'),
        path_and_query
    )
}

/// Re-encode an inbound multipart body into a fresh outbound form: every
/// file part keeps its field name, filename and content type; every scalar
/// field is copied verbatim. No size limits, no content-type allowlist;
/// validation is the backend's job.
async fn proxy_multipart(
    state: &AppState,
    method: Method,
    path_and_query: &str,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut form = reqwest::multipart::Form::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidRequest(e.to_string()))?;
                let mut part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name);
                if let Some(ct) = content_type {
                    part = part
                        .mime_str(&ct)
                        .map_err(|e| Error::InvalidRequest(e.to_string()))?;
                }
                form = form.part(name, part);
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidRequest(e.to_string()))?;
                form = form.text(name, text);
            }
        }
    }

    let resp = state
        .http
        .request(method, upstream_url(state, path_and_query))
        .multipart(form)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;
    mirror_response(state, path_and_query, resp).await
}

/// Forward a non-multipart request: method, headers (minus host and the
/// length/encoding headers the rebuilt body invalidates), and a
/// re-serialized JSON or form-urlencoded body. Other content types are
/// forwarded without a body.
async fn relay_plain(
    state: &AppState,
    method: Method,
    path_and_query: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response> {
    let mut rb = state
        .http
        .request(method, upstream_url(state, path_and_query));

    let mut forwarded = headers.clone();
    forwarded.remove(header::HOST);
    forwarded.remove(header::CONTENT_LENGTH);
    forwarded.remove(header::TRANSFER_ENCODING);
    // Left to the outbound client, which also transparently decompresses.
    forwarded.remove(header::ACCEPT_ENCODING);
    rb = rb.headers(forwarded);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidRequest(format!("invalid JSON body: {e}")))?;
        rb = rb.json(&value);
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body).into_owned().collect();
        rb = rb.form(&pairs);
    }

    let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
    mirror_response(state, path_and_query, resp).await
}

/// Mirror the upstream status; JSON bodies are parsed and re-serialized,
/// anything else passes through as text.
async fn mirror_response(
    state: &AppState,
    path_and_query: &str,
    resp: reqwest::Response,
) -> Result<Response> {
    let status = resp.status();
    let is_json = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    if is_json {
        let value: serde_json::Value = resp.json().await.map_err(|e| Error::Fetch(e.to_string()))?;
        record_progress(state, path_and_query, &value).await;
        Ok((status, Json(value)).into_response())
    } else {
        let text = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        Ok((status, text).into_response())
    }
}

/// Write-through: progress observed on the proxied polling path also lands
/// in the injected store, so `/api/rag_progress/:id` serves the last value
/// this relay has seen.
async fn record_progress(state: &AppState, path_and_query: &str, value: &serde_json::Value) {
    let Some(rest) = path_and_query.strip_prefix("/chatbot/rag_progress/") else {
        return;
    };
    let session_id = rest.split(['/', '?']).next().unwrap_or_default();
    if session_id.is_empty() {
        return;
    }
    if let Some(progress) = value.get("progress").and_then(|p| p.as_str()) {
        state.sessions.set(session_id, progress.to_string()).await;
    }
}
