//! RAG session plumbing: the default in-process store and the
//! create-from-url client.

use ragrelay_core::{Error, Result, SessionStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process [`SessionStore`].
///
/// Entries are never evicted, so the map grows for the process lifetime;
/// swap in a shared store for anything beyond a single relay process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<String> {
        self.entries.read().await.get(session_id).cloned()
    }

    async fn set(&self, session_id: &str, progress: String) {
        self.entries
            .write()
            .await
            .insert(session_id.to_string(), progress);
    }

    async fn delete(&self, session_id: &str) {
        self.entries.write().await.remove(session_id);
    }
}

#[derive(Debug, serde::Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

/// Ask the external RAG backend to build a session from a hosted PDF.
///
/// Not retried: session creation is not idempotent on the backend side.
/// A non-2xx response surfaces with the upstream body text embedded.
pub async fn create_session_from_url(
    http: &reqwest::Client,
    base_url: &str,
    pdf_url: &str,
) -> Result<String> {
    let endpoint = format!(
        "{}/chatbot/create_rag_session_from_url",
        base_url.trim_end_matches('/')
    );
    let resp = http
        .post(&endpoint)
        .json(&serde_json::json!({ "pdf_url": pdf_url }))
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: CreateSessionResponse =
        resp.json().await.map_err(|e| Error::Fetch(e.to_string()))?;
    Ok(parsed.session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_roundtrip_and_delete() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("s1").await, None);

        store.set("s1", "Processing...".to_string()).await;
        assert_eq!(store.get("s1").await.as_deref(), Some("Processing..."));

        store.set("s1", "Completed: index built".to_string()).await;
        assert_eq!(
            store.get("s1").await.as_deref(),
            Some("Completed: index built")
        );

        store.delete("s1").await;
        assert_eq!(store.get("s1").await, None);
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let store = MemorySessionStore::new();
        store.set("s2", "Processing...".to_string()).await;
        let first = store.get("s2").await;
        let second = store.get("s2").await;
        assert_eq!(first, second);
    }
}
