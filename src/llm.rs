use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::docs::types::{SummaryStatus, EMPTY_REPLY_SUMMARY, FAILED_PREFIX, NO_CONTENT_SUMMARY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// What the summarizer is asked to condense.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub content: &'a str,
    pub title: &'a str,
    pub url: &'a str,
}

/// Summarizer result. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub status: SummaryStatus,
    pub text: String,
}

impl SummaryOutcome {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            status: SummaryStatus::Ok,
            text: text.into(),
        }
    }

    pub fn skipped(text: impl Into<String>) -> Self {
        Self {
            status: SummaryStatus::Skipped,
            text: text.into(),
        }
    }

    /// Failure text always starts with [`FAILED_PREFIX`].
    pub fn failed(detail: impl std::fmt::Display) -> Self {
        Self {
            status: SummaryStatus::Failed,
            text: format!("{}: {}", FAILED_PREFIX, detail),
        }
    }
}

/// The external summarization call.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
    /// Model name recorded in each summary's metadata.
    fn model(&self) -> &str;

    async fn summarize(&self, request: SummaryRequest<'_>) -> SummaryOutcome;
}

fn system_prompt(request: &SummaryRequest<'_>) -> String {
    format!(
        "You are a cybersecurity assistant.\n\n\
         TITLE: {}\n\
         URL: {}\n\n\
         CONTENT:\n{}\n\n\
         Summarize the article in exactly 3-4 concise bullet points. Each point should include one of the following:\n\
         - Nature or type of threat\n\
         - Affected targets or sectors\n\
         - Known IOCs or techniques used\n\n\
         Use markdown format. Start each point with '-'.",
        request.title.trim(),
        request.url.trim(),
        request.content.trim()
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice. No choices or a null content is an empty reply.
fn reply_text(body: &str) -> Result<String> {
    let resp: ChatResponse = serde_json::from_str(body).context("Failed to parse LLM JSON")?;
    Ok(resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}

/// Client for an OpenAI-compatible chat completions endpoint (Ollama,
/// LM Studio, hosted APIs).
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434/v1".to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| "llama2".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        let timeout_secs = dotenv::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        Self::new(base_url, model, api_key, Duration::from_secs(timeout_secs))
    }

    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion; returns the reply text.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            anyhow::bail!("LLM returned {}: {}", status, text.trim());
        }
        reply_text(&text)
    }
}

impl Summarizer for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, request: SummaryRequest<'_>) -> SummaryOutcome {
        if request.content.trim().is_empty() {
            return SummaryOutcome::skipped(NO_CONTENT_SUMMARY);
        }

        let messages = vec![
            Message {
                role: "system".to_string(),
                content: system_prompt(&request),
            },
            Message {
                role: "user".to_string(),
                content: request.content.trim().to_string(),
            },
        ];

        match self.chat(&messages).await {
            Ok(reply) if reply.trim().is_empty() => {
                warn!(url = request.url, "LLM returned an empty summary");
                SummaryOutcome::skipped(EMPTY_REPLY_SUMMARY)
            }
            Ok(reply) => {
                debug!(url = request.url, len = reply.len(), "summary generated");
                SummaryOutcome::generated(reply.trim())
            }
            Err(e) => {
                warn!(url = request.url, "summarization failed: {:#}", e);
                SummaryOutcome::failed(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> LlmClient {
        LlmClient::new(
            base_url.to_string(),
            "llama2".to_string(),
            None,
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_resolution() {
        assert_eq!(
            client("http://localhost:11434/v1").endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            client("http://localhost:11434/").endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            client("https://api.example.com/v1/chat/completions").endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_failed_outcome_carries_prefix() {
        let outcome = SummaryOutcome::failed("connection refused");
        assert_eq!(outcome.status, SummaryStatus::Failed);
        assert_eq!(outcome.text, "❌ API request failed: connection refused");
        assert_eq!(SummaryStatus::infer(&outcome.text), SummaryStatus::Failed);
    }

    #[test]
    fn test_prompt_mentions_title_and_url() {
        let prompt = system_prompt(&SummaryRequest {
            content: "  body  ",
            title: " Lazarus returns ",
            url: "https://blog.example/lazarus",
        });
        assert!(prompt.contains("TITLE: Lazarus returns\n"));
        assert!(prompt.contains("URL: https://blog.example/lazarus\n"));
        assert!(prompt.contains("CONTENT:\nbody\n"));
    }

    #[test]
    fn test_reply_text_tolerates_missing_content() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "- ransomware"}}]}"#;
        assert_eq!(reply_text(body).unwrap(), "- ransomware");

        let null = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert_eq!(reply_text(null).unwrap(), "");
        assert_eq!(reply_text(r#"{"choices": []}"#).unwrap(), "");
        assert!(reply_text("<html>bad gateway</html>").is_err());
    }

    #[tokio::test]
    async fn test_empty_content_not_sent() {
        // Nothing listens here; a request would fail rather than skip.
        let llm = client("http://127.0.0.1:9/v1");
        let outcome = llm
            .summarize(SummaryRequest {
                content: "   ",
                title: "t",
                url: "https://a",
            })
            .await;
        assert_eq!(outcome, SummaryOutcome::skipped(NO_CONTENT_SUMMARY));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_failure_value() {
        let llm = client("http://127.0.0.1:9/v1");
        let outcome = llm
            .summarize(SummaryRequest {
                content: "APT29 phishing wave",
                title: "t",
                url: "https://a",
            })
            .await;
        assert_eq!(outcome.status, SummaryStatus::Failed);
        assert!(outcome.text.starts_with(FAILED_PREFIX));
    }
}
