//! OpenAI-compatible chat.completions client used for paper summaries.

use crate::fetch::{send_with_retry, RetryPolicy};
use ragrelay_core::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SUMMARY_MAX_TOKENS: u64 = 500;
const SUMMARY_TEMPERATURE: f64 = 0.7;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that specializes in summarizing \
academic papers. Provide clear, concise summaries that capture the main findings, methodology, \
and conclusions.";

#[derive(Debug, Clone)]
pub struct SummaryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl SummaryClient {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = crate::env("OPENAI_API_KEY")
            .ok_or_else(|| Error::NotConfigured("missing OPENAI_API_KEY".to_string()))?;
        let base_url =
            crate::env("RAGRELAY_OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model =
            crate::env("RAGRELAY_SUMMARY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Summarize extracted paper text in the fixed academic-summary style.
    ///
    /// Failures are [`Error::Summarize`], distinct from search/fetch errors,
    /// so the batch loop can attribute the skip correctly.
    pub async fn summarize(&self, text: &str, policy: &RetryPolicy) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SUMMARY_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: format!(
                        "Please summarize the following academic paper text:\n\n{text}"
                    ),
                },
            ],
            max_tokens: Some(SUMMARY_MAX_TOKENS),
            temperature: Some(SUMMARY_TEMPERATURE),
            stream: Some(false),
        };

        let rb = self
            .client
            .post(self.endpoint_chat_completions())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&req);

        let resp = send_with_retry(rb, policy).await.map_err(|e| match e {
            Error::Upstream { status, body } => {
                Error::Summarize(format!("chat.completions HTTP {status}: {body}"))
            }
            other => Error::Summarize(other.to_string()),
        })?;

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Summarize(e.to_string()))?;
        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}
