//! Structured text-analysis capabilities over a chat-completion provider.
//!
//! The pipeline consumes the [`NewsAnalyst`] trait; [`LlmAnalyst`] is the
//! production implementation: tight prompts, low temperature, and
//! markdown-tolerant JSON extraction from the model output.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::{Analysis, Category};

/// Temperature for all structured calls (deterministic-ish).
const ANALYST_TEMPERATURE: f32 = 0.1;

/// Max tokens for per-post calls (analysis, classification).
const PER_POST_MAX_TOKENS: u32 = 512;

/// Max tokens for summary calls.
const SUMMARY_MAX_TOKENS: u32 = 1024;

/// Text-analysis capabilities the pipeline stages call.
///
/// Each method maps to one stage's external call. Failures are per-call:
/// a failed `analyze` on one post says nothing about the next post.
#[async_trait]
pub trait NewsAnalyst: Send + Sync {
    /// Extract keywords, sentiment, and an importance score from a post.
    async fn analyze(&self, text: &str) -> Result<Analysis, LlmError>;

    /// Assign a post to one category of the closed set.
    async fn classify(&self, text: &str) -> Result<Category, LlmError>;

    /// Summarize one category's combined posts.
    async fn summarize(
        &self,
        combined_text: &str,
        category: Category,
        count: usize,
    ) -> Result<String, LlmError>;

    /// Synthesize the overall cross-category summary from the digest lines.
    async fn synthesize(&self, digest: &str) -> Result<String, LlmError>;
}

/// [`NewsAnalyst`] implementation backed by an [`LlmProvider`].
pub struct LlmAnalyst {
    llm: Arc<dyn LlmProvider>,
}

impl LlmAnalyst {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn structured_call(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_temperature(ANALYST_TEMPERATURE)
        .with_max_tokens(max_tokens);

        let response = self.llm.complete(request).await?;
        Ok(response.content)
    }
}

#[async_trait]
impl NewsAnalyst for LlmAnalyst {
    async fn analyze(&self, text: &str) -> Result<Analysis, LlmError> {
        let raw = self
            .structured_call(
                build_analyzer_system_prompt(),
                format!("Post:\n{}", truncate(text, 2000)),
                PER_POST_MAX_TOKENS,
            )
            .await?;
        parse_analysis_response(&raw).map_err(|reason| LlmError::InvalidResponse {
            provider: self.llm.model_name().to_string(),
            reason,
        })
    }

    async fn classify(&self, text: &str) -> Result<Category, LlmError> {
        let raw = self
            .structured_call(
                build_classifier_system_prompt(),
                format!("Post:\n{}", truncate(text, 2000)),
                PER_POST_MAX_TOKENS,
            )
            .await?;
        parse_classifier_response(&raw).map_err(|reason| LlmError::InvalidResponse {
            provider: self.llm.model_name().to_string(),
            reason,
        })
    }

    async fn summarize(
        &self,
        combined_text: &str,
        category: Category,
        count: usize,
    ) -> Result<String, LlmError> {
        let raw = self
            .structured_call(
                build_summarizer_system_prompt(),
                format!(
                    "Category: {category}\nPost count: {count}\n\nPosts:\n{}",
                    truncate(combined_text, 8000)
                ),
                SUMMARY_MAX_TOKENS,
            )
            .await?;
        parse_summarizer_response(&raw).map_err(|reason| LlmError::InvalidResponse {
            provider: self.llm.model_name().to_string(),
            reason,
        })
    }

    async fn synthesize(&self, digest: &str) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(
                "You write the closing overview of a news digest. Given one line \
                 per category, write a short connected overview (3-5 sentences) of \
                 the day's news across all categories. Plain text, no markdown."
                    .to_string(),
            ),
            ChatMessage::user(digest.to_string()),
        ])
        .with_temperature(ANALYST_TEMPERATURE)
        .with_max_tokens(SUMMARY_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_analyzer_system_prompt() -> String {
    "You analyze a single news post.\n\
     Respond with ONLY a JSON object:\n\
     {\"keywords\": [\"...\"], \"sentiment\": \"...\", \"importance_score\": 0.0}\n\n\
     Rules:\n\
     - keywords: 5-7 key terms from the post\n\
     - sentiment: one of \"positive\", \"neutral\", \"negative\"\n\
     - importance_score: 0.0 (trivial) to 1.0 (major breaking news)"
        .to_string()
}

fn build_classifier_system_prompt() -> String {
    let labels = Category::ALL
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You classify a single news post into exactly one category.\n\
         Allowed categories: {labels}.\n\
         Respond with ONLY a JSON object: {{\"category\": \"...\"}}\n\
         The category value must be one of the allowed labels, verbatim."
    )
}

fn build_summarizer_system_prompt() -> String {
    "You summarize a batch of news posts that all belong to one category.\n\
     Respond with ONLY a JSON object: {\"summary\": \"...\"}\n\
     The summary is 2-4 sentences covering the main developments."
        .to_string()
}

/// Truncate on a char boundary, for token economy.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    importance_score: f32,
}

#[derive(Deserialize)]
struct ClassifierResponse {
    category: String,
}

#[derive(Deserialize)]
struct SummarizerResponse {
    summary: String,
}

fn parse_analysis_response(raw: &str) -> Result<Analysis, String> {
    let json = extract_json_object(raw);
    let parsed: AnalysisResponse =
        serde_json::from_str(&json).map_err(|e| format!("JSON parse error: {e}"))?;

    if parsed.keywords.is_empty() {
        return Err("analysis response has no keywords".to_string());
    }

    Ok(Analysis {
        keywords: parsed.keywords,
        sentiment: if parsed.sentiment.is_empty() {
            "neutral".to_string()
        } else {
            parsed.sentiment
        },
        importance_score: parsed.importance_score.clamp(0.0, 1.0),
    })
}

fn parse_classifier_response(raw: &str) -> Result<Category, String> {
    let json = extract_json_object(raw);
    let parsed: ClassifierResponse =
        serde_json::from_str(&json).map_err(|e| format!("JSON parse error: {e}"))?;

    Category::from_label(&parsed.category)
        .ok_or_else(|| format!("unknown category label: '{}'", parsed.category))
}

fn parse_summarizer_response(raw: &str) -> Result<String, String> {
    let json = extract_json_object(raw);
    let parsed: SummarizerResponse =
        serde_json::from_str(&json).map_err(|e| format!("JSON parse error: {e}"))?;

    if parsed.summary.trim().is_empty() {
        return Err("summarizer response has empty summary".to_string());
    }
    Ok(parsed.summary)
}

/// Pull a JSON object out of model output that may wrap it in markdown
/// fences or surrounding prose.
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Fenced block, with or without a language tag.
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let inner = &trimmed[start + fence.len()..];
            if let Some(end) = inner.find("```") {
                let candidate = inner[..end].trim();
                if candidate.starts_with('{') {
                    return candidate.to_string();
                }
            }
        }
    }

    // Last resort: widest brace span.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_prompt_names_all_fields() {
        let prompt = build_analyzer_system_prompt();
        assert!(prompt.contains("keywords"));
        assert!(prompt.contains("sentiment"));
        assert!(prompt.contains("importance_score"));
    }

    #[test]
    fn classifier_prompt_lists_every_category() {
        let prompt = build_classifier_system_prompt();
        for category in Category::ALL {
            assert!(prompt.contains(category.label()), "missing {category}");
        }
    }

    #[test]
    fn parse_analysis_clamps_score() {
        let raw = r#"{"keywords": ["a", "b"], "sentiment": "positive", "importance_score": 1.7}"#;
        let analysis = parse_analysis_response(raw).unwrap();
        assert!((analysis.importance_score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_analysis_defaults_empty_sentiment() {
        let raw = r#"{"keywords": ["a"], "importance_score": 0.3}"#;
        let analysis = parse_analysis_response(raw).unwrap();
        assert_eq!(analysis.sentiment, "neutral");
    }

    #[test]
    fn parse_analysis_rejects_missing_keywords() {
        let raw = r#"{"sentiment": "neutral", "importance_score": 0.3}"#;
        assert!(parse_analysis_response(raw).is_err());
    }

    #[test]
    fn parse_classifier_known_label() {
        let raw = r#"{"category": "Technology"}"#;
        assert_eq!(parse_classifier_response(raw).unwrap(), Category::Technology);
    }

    #[test]
    fn parse_classifier_unknown_label_fails() {
        let raw = r#"{"category": "Gardening"}"#;
        let err = parse_classifier_response(raw).unwrap_err();
        assert!(err.contains("Gardening"));
    }

    #[test]
    fn parse_summarizer_rejects_empty() {
        assert!(parse_summarizer_response(r#"{"summary": "  "}"#).is_err());
        assert_eq!(
            parse_summarizer_response(r#"{"summary": "Busy day in tech."}"#).unwrap(),
            "Busy day in tech."
        );
    }

    #[test]
    fn extract_json_direct_object() {
        let input = r#"{"category": "Science"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_json_from_fenced_block() {
        let input = "Sure!\n```json\n{\"category\": \"Sports\"}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("Sports"));
    }

    #[test]
    fn extract_json_embedded_in_prose() {
        let input = "The answer is {\"summary\": \"quiet day\"} overall.";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("привет мир", 6), "привет");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
