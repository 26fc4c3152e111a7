//! LLM integration.
//!
//! The provider layer speaks the OpenAI-compatible `/chat/completions`
//! dialect, which covers OpenAI itself plus GigaChat-style gateways.
//! The analyst layer turns completions into the structured capabilities
//! (analysis, classification, summarization) the pipeline consumes.

pub mod analyst;
pub mod openai_compat;
pub mod provider;

pub use analyst::{LlmAnalyst, NewsAnalyst};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};

use std::sync::Arc;

use secrecy::SecretString;

/// Default base URL when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    tracing::info!(model = %config.model, base_url = %config.base_url, "Using LLM provider");
    Arc::new(OpenAiCompatProvider::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_reports_model_name() {
        let config = LlmConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: SecretString::from("test-key"),
            model: "gpt-4o-mini".to_string(),
        };
        let provider = create_provider(&config);
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }
}
