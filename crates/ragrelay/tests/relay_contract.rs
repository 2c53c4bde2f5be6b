//! Contract tests for the /chatbot catch-all relay and the session routes.

use axum::extract::{Multipart, Path};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ragrelay::server::{router, AppState};
use ragrelay_local::fetch::RetryPolicy;
use ragrelay_local::session::MemorySessionStore;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Mock of the external FastAPI RAG backend.
fn mock_backend() -> Router {
    Router::new()
        .route(
            "/chatbot/create_rag_session",
            post(|mut multipart: Multipart| async move {
                let mut file_ok = false;
                let mut source = None;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    match field.file_name().map(str::to_string) {
                        Some(file_name) => {
                            let bytes = field.bytes().await.unwrap();
                            file_ok = name == "file"
                                && file_name == "paper.pdf"
                                && bytes.starts_with(b"%PDF-");
                        }
                        None => {
                            if name == "source" {
                                source = Some(field.text().await.unwrap());
                            }
                        }
                    }
                }
                if file_ok && source.as_deref() == Some("upload") {
                    Json(json!({ "session_id": "abc123" })).into_response()
                } else {
                    (StatusCode::BAD_REQUEST, "missing multipart parts").into_response()
                }
            }),
        )
        .route(
            "/chatbot/create_rag_session_from_url",
            post(|Json(body): Json<Value>| async move {
                let pdf_url = body["pdf_url"].as_str().unwrap_or_default();
                if pdf_url.contains("bad.example") {
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom upstream").into_response()
                } else {
                    Json(json!({ "session_id": "xyz789" })).into_response()
                }
            }),
        )
        .route(
            "/chatbot/chat_with_rag",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "session_id": body["session_id"],
                    "answer": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
                }))
            }),
        )
        .route(
            "/chatbot/rag_progress/:id",
            get(|Path(id): Path<String>| async move {
                let progress = if id == "s-done" {
                    "Completed: 5 chunks indexed"
                } else {
                    "Processing..."
                };
                Json(json!({ "progress": progress }))
            }),
        )
        .route(
            "/chatbot/plain",
            get(|| async { (StatusCode::NOT_FOUND, "session not found") }),
        )
}

async fn start_relay() -> SocketAddr {
    let backend = serve(mock_backend()).await;
    let state = Arc::new(AppState {
        http: ragrelay_local::default_client().unwrap(),
        fastapi_url: format!("http://{backend}"),
        retry: RetryPolicy {
            retries: 3,
            delay: Duration::from_millis(5),
        },
        sessions: Arc::new(MemorySessionStore::new()),
    });
    serve(router(state)).await
}

#[tokio::test]
async fn multipart_upload_is_reencoded_and_mirrored() {
    let relay = start_relay().await;

    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 fake body".to_vec())
        .file_name("paper.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("source", "upload");

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/chatbot/create_rag_session"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "session_id": "abc123" }));
}

#[tokio::test]
async fn non_json_status_and_body_are_mirrored() {
    let relay = start_relay().await;

    let resp = reqwest::get(format!("http://{relay}/chatbot/plain"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "session not found");
}

#[tokio::test]
async fn json_bodies_are_relayed_verbatim() {
    let relay = start_relay().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/chatbot/chat_with_rag"))
        .json(&json!({ "session_id": "abc123", "message": "what is the key result?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["session_id"], "abc123");
    assert_eq!(body["answer"], "echo: what is the key result?");
}

#[tokio::test]
async fn malformed_json_is_rejected_before_forwarding() {
    let relay = start_relay().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/chatbot/chat_with_rag"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid JSON"));
}

#[tokio::test]
async fn proxied_progress_populates_the_injected_store() {
    let relay = start_relay().await;
    let client = reqwest::Client::new();

    // Never-seen id: empty progress, 200, and stable across reads.
    for _ in 0..2 {
        let resp = client
            .get(format!("http://{relay}/api/rag_progress/never-seen"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "progress": "" }));
    }

    // Polling through the relay is the canonical path...
    let resp = client
        .get(format!("http://{relay}/chatbot/rag_progress/s-done"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["progress"], "Completed: 5 chunks indexed");

    // ...and the local endpoint serves the last observed value afterwards.
    let resp = client
        .get(format!("http://{relay}/api/rag_progress/s-done"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["progress"], "Completed: 5 chunks indexed");
}

#[tokio::test]
async fn create_session_from_url_returns_the_backend_id() {
    let relay = start_relay().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/api/create_rag_session_from_url"))
        .json(&json!({ "pdf_url": "https://arxiv.org/pdf/1706.03762v5.pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "session_id": "xyz789" }));
}

#[tokio::test]
async fn create_session_from_url_embeds_the_upstream_error_body() {
    let relay = start_relay().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/api/create_rag_session_from_url"))
        .json(&json!({ "pdf_url": "https://bad.example/broken.pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("boom upstream"));
    assert!(message.contains("500"));
}

#[tokio::test]
async fn create_session_from_url_requires_pdf_url() {
    let relay = start_relay().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{relay}/api/create_rag_session_from_url"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "pdf_url parameter is required");
}
