//! OpenAI-compatible chat-completions client backing the core `Generator`.
//!
//! Works against any provider exposing `POST {base}/chat/completions`
//! (DeepSeek, OpenAI, local vLLM/Ollama gateways).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use trener_core::error::GenerationError;
use trener_core::generation::{ChatMessage, CompletionRequest, Generator};

use crate::config::LlmConfig;

const CONNECT_TIMEOUT_SECS: u64 = 5;
/// Upper bound on a single HTTP exchange; callers apply tighter turn budgets.
const REQUEST_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionsClient {
    client: Client,
    config: LlmConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }
}

#[async_trait]
impl Generator for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GenerationError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        };

        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        content_from_body(&text)
    }
}

/// First choice's message content.
fn content_from_body(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Transport(format!("failed to parse response: {e}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;

    tracing::debug!(
        finish_reason = ?choice.finish_reason,
        "chat completion received"
    );

    choice
        .message
        .content
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":" {\"reply\":\"Ок\"} "},"finish_reason":"stop"}]}"#;
        assert_eq!(content_from_body(body).unwrap(), "{\"reply\":\"Ок\"}");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        assert!(matches!(
            content_from_body(r#"{"choices":[]}"#),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            content_from_body(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn request_body_uses_wire_field_names() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = ChatCompletionBody {
            model: "deepseek-chat",
            messages: &messages,
            temperature: 0.0,
            max_tokens: 400,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["max_tokens"], 400);
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let client = ChatCompletionsClient::new(LlmConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".into(),
            model: "deepseek-chat".into(),
        })
        .unwrap();
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("привет")],
            temperature: 0.15,
            max_tokens: 450,
        };
        assert!(matches!(
            client.complete(&request).await,
            Err(GenerationError::NotConfigured(_))
        ));
    }
}
