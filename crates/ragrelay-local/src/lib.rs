//! Local (reqwest) implementations for ragrelay.
//!
//! Everything that talks to the network lives here: the retrying fetch
//! helper, the arXiv Atom client, PDF text extraction, the summarization
//! client, the search-and-summarize pipeline, and the RAG session plumbing
//! (store, creation client, progress poller).

use ragrelay_core::{Error, Result};

pub mod arxiv;
pub mod extract;
pub mod fetch;
pub mod openai_compat;
pub mod pipeline;
pub mod progress;
pub mod session;

/// Identifying header sent on every outbound call.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ragrelay/0.1; +https://github.com/arclabs561/ragrelay)";

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Shared outbound HTTP client carrying the relay's fixed User-Agent.
///
/// No explicit timeouts: callers depend on the client's and the upstream's
/// own behavior.
pub fn default_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}
