//! OpenAI-compatible chat completions provider.
//!
//! Talks to any backend exposing the `/chat/completions` REST dialect
//! (OpenAI, GigaChat, local gateways) with bearer auth.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};

/// Provider over an OpenAI-compatible REST endpoint.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai-compat".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "openai-compat".to_string(),
                reason: format!("HTTP {status}: {detail}"),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "openai-compat".to_string(),
                reason: format!("body decode failed: {e}"),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "openai-compat".to_string(),
                reason: "response contained no choices".to_string(),
            })?;

        Ok(CompletionResponse {
            content: choice.message.content,
            input_tokens: parsed.usage.prompt_tokens,
            output_tokens: parsed.usage.completion_tokens,
        })
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let provider = OpenAiCompatProvider::new(
            "https://api.example.com/v1/",
            SecretString::from("test-key"),
            "test-model",
        );
        assert_eq!(provider.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn response_wire_format_parses() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
        assert_eq!(parsed.usage.prompt_tokens, 12);
    }

    #[test]
    fn response_without_usage_defaults_to_zero() {
        let raw = r#"{"choices": [{"message": {"content": "x"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.usage.prompt_tokens, 0);
        assert_eq!(parsed.usage.completion_tokens, 0);
    }

    #[test]
    fn body_omits_unset_knobs() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ChatCompletionBody {
            model: "m",
            messages: &messages,
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }
}
