//! Cancellable progress polling for RAG sessions.
//!
//! Replaces a fire-and-forget client timer with an explicit task: poll the
//! backend's progress endpoint at a fixed interval, publish each observed
//! string, stop on the terminal `Completed` prefix or on cancellation.

use ragrelay_core::{Error, Result};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// The only recognized terminal signal in the progress contract.
pub const TERMINAL_PREFIX: &str = "Completed";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Handle for a running progress poll. Dropping it does not stop the task;
/// call [`PollHandle::cancel`] on teardown.
pub struct PollHandle {
    progress: watch::Receiver<String>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Watch the observed progress strings ("" until the first poll lands).
    pub fn progress(&self) -> watch::Receiver<String> {
        self.progress.clone()
    }

    /// Stop polling. Idempotent; a no-op once the task has self-terminated.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn fetch_progress(http: &reqwest::Client, url: &str) -> Result<String> {
    #[derive(serde::Deserialize)]
    struct ProgressResponse {
        #[serde(default)]
        progress: String,
    }

    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;
    let parsed: ProgressResponse = resp.json().await.map_err(|e| Error::Fetch(e.to_string()))?;
    Ok(parsed.progress)
}

/// Poll `<base>/chatbot/rag_progress/<session_id>` until the progress string
/// carries the [`TERMINAL_PREFIX`].
///
/// A failed poll is skipped, not fatal: the watch value stops moving until
/// the backend answers again, and the caller decides what a stall means.
pub fn spawn_progress_poll(
    http: reqwest::Client,
    base_url: &str,
    session_id: &str,
    interval: Duration,
) -> PollHandle {
    let url = format!(
        "{}/chatbot/rag_progress/{}",
        base_url.trim_end_matches('/'),
        session_id
    );
    let (progress_tx, progress_rx) = watch::channel(String::new());
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut cancel_rx => break,
                _ = ticker.tick() => {
                    let value = match fetch_progress(&http, &url).await {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::debug!(error = %e, "progress poll failed");
                            continue;
                        }
                    };
                    let done = value.starts_with(TERMINAL_PREFIX);
                    let _ = progress_tx.send(value);
                    if done {
                        break;
                    }
                }
            }
        }
    });

    PollHandle {
        progress: progress_rx,
        cancel: Some(cancel_tx),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, routing::get, Json, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn progress_app(hits: Arc<AtomicUsize>, terminal_after: usize) -> Router {
        Router::new().route(
            "/chatbot/rag_progress/:id",
            get(move |State(hits): State<Arc<AtomicUsize>>| async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                let progress = if n < terminal_after {
                    "Processing...".to_string()
                } else {
                    "Completed: index built".to_string()
                };
                Json(serde_json::json!({ "progress": progress }))
            })
            .with_state(hits),
        )
    }

    #[tokio::test]
    async fn stops_on_the_terminal_prefix() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(progress_app(hits.clone(), 2)).await;

        let mut handle = spawn_progress_poll(
            reqwest::Client::new(),
            &format!("http://{addr}"),
            "s1",
            Duration::from_millis(10),
        );

        let mut rx = handle.progress();
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|v| v.starts_with(TERMINAL_PREFIX)),
        )
        .await
        .expect("poller should reach the terminal value")
        .unwrap();

        // Self-terminated: no further polls after the terminal value.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), settled);
        assert!(handle.is_finished());
        handle.cancel();
    }

    #[tokio::test]
    async fn cancel_stops_polling() {
        let hits = Arc::new(AtomicUsize::new(0));
        // Never reaches the terminal value on its own.
        let addr = serve(progress_app(hits.clone(), usize::MAX)).await;

        let mut handle = spawn_progress_poll(
            reqwest::Client::new(),
            &format!("http://{addr}"),
            "s2",
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let settled = hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), settled);
        assert!(handle.is_finished());
    }
}
