use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("upstream HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("feed parse failed: {0}")]
    Feed(String),
    #[error("No papers found for the given query")]
    NoResults,
    #[error("No papers could be processed successfully")]
    NoneProcessed,
    #[error("pdf extract failed: {0}")]
    Extract(String),
    #[error("summarization failed: {0}")]
    Summarize(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One successfully processed paper: feed metadata plus the extracted text
/// and the generated summary. Serialized field names are the relay's wire
/// contract, so renames here are load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(rename = "pdfUrl")]
    pub pdf_url: String,
    #[serde(rename = "arxivUrl")]
    pub arxiv_url: String,
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
    #[serde(rename = "fullText")]
    pub full_text: String,
    pub summary: String,
}

/// Key-value store for per-session progress strings.
///
/// The relay only ever does whole-value reads and last-write-wins writes, so
/// implementations need no transactional discipline. Injected rather than
/// module-level so a shared/persistent store can be swapped in without
/// touching call sites.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Progress for a session id; `None` if the id has never been seen.
    async fn get(&self, session_id: &str) -> Option<String>;
    async fn set(&self, session_id: &str, progress: String);
    async fn delete(&self, session_id: &str);
}
