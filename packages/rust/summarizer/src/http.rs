//! HTTP chat-completions summarizer client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use commentkeeper_shared::{CommentKeeperError, Result, SummarizerConfig};

use crate::Summarizer;

/// User-Agent string for summarizer requests.
const USER_AGENT: &str = concat!("CommentKeeper/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// HttpSummarizer
// ---------------------------------------------------------------------------

/// Summarizer over an authenticated OpenAI-style chat-completions endpoint.
pub struct HttpSummarizer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    max_input_chars: usize,
}

impl HttpSummarizer {
    /// Build a client from config, reading the API key from the configured
    /// env var.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            CommentKeeperError::config(format!(
                "summarizer API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key (tests, embedding callers).
    pub fn with_api_key(config: &SummarizerConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                CommentKeeperError::Summarization(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_input_chars: config.max_input_chars,
        })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    #[instrument(skip_all, fields(model = %self.model, chars = text.len()))]
    async fn summarize(&self, text: &str) -> Result<String> {
        let truncated = truncate_content(text, self.max_input_chars);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &truncated,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CommentKeeperError::Summarization(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Char-based truncation; error bodies can be multibyte prose.
            let snippet: String = body.chars().take(200).collect();
            return Err(CommentKeeperError::Summarization(format!(
                "endpoint returned {status}: {snippet}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            CommentKeeperError::Summarization(format!("invalid response body: {e}"))
        })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CommentKeeperError::Summarization("response contained no choices".into())
            })?;

        debug!(chars = content.len(), "summary received");
        Ok(content)
    }
}

/// Truncate content to approximately `max_chars` characters, respecting
/// char boundaries.
fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }
    let cut = content
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max_chars)
        .last()
        .unwrap_or(0);
    format!(
        "{}\n\n[... content truncated for LLM context window ...]",
        &content[..cut]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String) -> SummarizerConfig {
        SummarizerConfig {
            endpoint,
            api_key_env: "UNUSED".into(),
            model: "deepseek-chat".into(),
            system_prompt: "Summarize the post.".into(),
            max_input_chars: 12_000,
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn summarize_sends_model_and_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("  A summary.  ")))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(format!("{}/v1/chat/completions", server.uri()));
        let summarizer =
            HttpSummarizer::with_api_key(&config, "sk-test".into()).expect("build client");

        let summary = summarizer.summarize("post body").await.expect("summarize");
        assert_eq!(summary, "A summary.");
    }

    #[tokio::test]
    async fn http_error_maps_to_summarization_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let summarizer =
            HttpSummarizer::with_api_key(&config, "sk-test".into()).expect("build client");

        let err = summarizer.summarize("post body").await.unwrap_err();
        assert!(matches!(err, CommentKeeperError::Summarization(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn multibyte_error_body_maps_to_failure_without_panicking() {
        let server = MockServer::start().await;
        // 300 bytes of CJK text: a byte-index cut at 200 would land inside a
        // character.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("错".repeat(100)))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let summarizer =
            HttpSummarizer::with_api_key(&config, "sk-test".into()).expect("build client");

        let err = summarizer.summarize("post body").await.unwrap_err();
        assert!(matches!(err, CommentKeeperError::Summarization(_)));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains('错'));
    }

    #[tokio::test]
    async fn empty_choices_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let summarizer =
            HttpSummarizer::with_api_key(&config, "sk-test".into()).expect("build client");

        let err = summarizer.summarize("post body").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn truncate_short_content() {
        assert_eq!(truncate_content("short text", 100), "short text");
    }

    #[test]
    fn truncate_long_content() {
        let content = "a".repeat(200);
        let result = truncate_content(&content, 100);
        assert!(result.len() > 100);
        assert!(result.contains("truncated"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let content = "界".repeat(100); // 3 bytes per char
        let result = truncate_content(&content, 100);
        assert!(result.contains("truncated"));
    }
}
