//! Outbound request helper with a flat, fixed-delay retry budget.
//!
//! Policy: transport errors and 5xx responses retry; 4xx responses fail
//! fast without consuming the budget. No exponential backoff, no jitter.

use ragrelay_core::{Error, Result};
use std::time::Duration;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, not re-attempts: `retries = 3` sends at most 3 requests.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

/// Send `request`, retrying per `policy`. Returns the response only on a
/// 2xx status; HTTP failures surface as [`Error::Upstream`] carrying the
/// status and the response body text.
///
/// The builder is cloned per attempt, so streaming bodies are not
/// retryable.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response> {
    let retries = policy.retries.max(1);
    let mut last_err = None;

    for attempt in 1..=retries {
        let req = request
            .try_clone()
            .ok_or_else(|| Error::Fetch("request is not cloneable".to_string()))?;
        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                let err = Error::Upstream {
                    status: status.as_u16(),
                    body,
                };
                if status.is_client_error() {
                    return Err(err);
                }
                tracing::warn!(attempt, retries, status = status.as_u16(), "retrying HTTP failure");
                last_err = Some(err);
            }
            Err(e) => {
                tracing::warn!(attempt, retries, error = %e, "retrying transport failure");
                last_err = Some(Error::Fetch(e.to_string()));
            }
        }
        if attempt < retries {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Fetch("request failed".to_string())))
}
