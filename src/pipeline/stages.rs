//! The five digest stages and the error terminal.
//!
//! Two-tier failure model:
//! - Per-post/per-category calls are absorbed via [`or_fallback`] and the
//!   run continues with deterministic substitute values.
//! - Stage-scoped failures (the collector's batch fetch, the reporter's
//!   synthesis call) are recorded as `"{Stage} error: {detail}"` in
//!   `state.errors`, which makes the driver divert to the error terminal.
//!
//! The collector deliberately does not isolate per-channel failures: one
//! failing channel aborts the whole stage. Later stages isolate per-item.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::llm::NewsAnalyst;
use crate::models::{
    AnalyzedNews, Analysis, Category, CategorySummary, NewsItem, Report, ReportSection,
};
use crate::pipeline::state::{CategoryBuckets, PipelineState};
use crate::sources::NewsSource;

/// Title of a successful digest.
pub const REPORT_TITLE: &str = "News digest";

/// Title of the degraded report produced by the error terminal.
pub const ERROR_REPORT_TITLE: &str = "Digest generation failed";

/// Fixed period label the digest covers.
pub const REPORT_PERIOD: &str = "day";

/// The digest pipeline over a news source and an analyst.
///
/// Holds no per-run state: every [`run`](crate::pipeline::DigestPipeline::run)
/// builds a fresh `PipelineState`, so concurrent runs never share anything
/// beyond the capabilities themselves.
pub struct DigestPipeline {
    pub(crate) source: Arc<dyn NewsSource>,
    pub(crate) analyst: Arc<dyn NewsAnalyst>,
}

impl DigestPipeline {
    pub fn new(source: Arc<dyn NewsSource>, analyst: Arc<dyn NewsAnalyst>) -> Self {
        Self { source, analyst }
    }

    /// Stage 1: fetch recent posts from every channel, in input order.
    ///
    /// The fetch is all-or-nothing per channel; any failure aborts the
    /// stage with a single collector error.
    pub async fn collect(&self, state: PipelineState) -> PipelineState {
        info!(
            channels = state.channels.len(),
            limit = state.limit_per_channel,
            "Collecting posts"
        );

        let mut collected = Vec::new();
        for channel in &state.channels {
            match self.source.fetch(channel, state.limit_per_channel).await {
                Ok(items) => collected.extend(items),
                Err(e) => {
                    error!(channel = %channel, error = %e, "Collector stage failed");
                    return state.with_error(format!("Collector error: {e}"));
                }
            }
        }

        info!(collected = collected.len(), "Collection complete");
        PipelineState { collected, ..state }
    }

    /// Stage 2: analyze each post independently.
    ///
    /// A failed per-post call substitutes [`Analysis::fallback`] and the
    /// stage carries on; an empty input yields an empty output.
    pub async fn analyze(&self, state: PipelineState) -> PipelineState {
        info!(posts = state.collected.len(), "Analyzing posts");

        let mut analyzed = Vec::with_capacity(state.collected.len());
        for item in &state.collected {
            let analysis = or_fallback(
                "analysis",
                &item.id,
                self.analyst.analyze(&item.text).await,
                Analysis::fallback,
            );
            analyzed.push(AnalyzedNews {
                analysis,
                item: item.clone(),
            });
        }

        PipelineState { analyzed, ..state }
    }

    /// Stage 3: assign each analyzed post to one category.
    ///
    /// Unknown or failed classifications fall back to the catch-all
    /// category; buckets are created lazily in first-appearance order.
    pub async fn classify(&self, state: PipelineState) -> PipelineState {
        info!(posts = state.analyzed.len(), "Classifying posts");

        let mut categorized = CategoryBuckets::default();
        for analyzed in &state.analyzed {
            let category = or_fallback(
                "classification",
                &analyzed.item.id,
                self.analyst.classify(&analyzed.item.text).await,
                || Category::FALLBACK,
            );
            categorized.push(category, analyzed.clone());
        }

        PipelineState {
            categorized,
            ..state
        }
    }

    /// Stage 4: summarize each category's combined posts.
    ///
    /// A failed per-category call substitutes a templated summary; the
    /// count always reflects the actual bucket size.
    pub async fn summarize(&self, state: PipelineState) -> PipelineState {
        info!(categories = state.categorized.len(), "Summarizing categories");

        let mut summaries = Vec::with_capacity(state.categorized.len());
        for (category, entries) in state.categorized.iter() {
            let combined = entries
                .iter()
                .map(|e| e.item.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let count = entries.len();

            let summary = or_fallback(
                "summary",
                category.label(),
                self.analyst.summarize(&combined, category, count).await,
                || format!("News in category {category}"),
            );

            summaries.push(CategorySummary {
                category,
                summary,
                news_count: count,
            });
        }

        PipelineState { summaries, ..state }
    }

    /// Stage 5: assemble the report and synthesize the overall summary.
    ///
    /// The synthesis call is stage-scoped: if it fails, no report is set
    /// and a reporter error is recorded instead.
    pub async fn report(&self, state: PipelineState) -> PipelineState {
        info!(summaries = state.summaries.len(), "Generating report");

        let mut sections = Vec::with_capacity(state.summaries.len());
        let mut digest_lines = Vec::with_capacity(state.summaries.len());

        for summary in &state.summaries {
            let items: Vec<NewsItem> = state
                .categorized
                .get(summary.category)
                .unwrap_or(&[])
                .iter()
                .map(|e| e.item.clone())
                .collect();

            digest_lines.push(format!(
                "Category '{}' ({} items): {}",
                summary.category, summary.news_count, summary.summary
            ));
            sections.push(ReportSection {
                category: summary.category,
                summary: summary.summary.clone(),
                news_count: summary.news_count,
                items,
            });
        }

        match self.analyst.synthesize(&digest_lines.join("\n\n")).await {
            Ok(overall_summary) => {
                let report = Report {
                    id: Uuid::new_v4().to_string(),
                    title: REPORT_TITLE.to_string(),
                    date: Utc::now(),
                    period: REPORT_PERIOD.to_string(),
                    categories: sections,
                    overall_summary,
                };
                PipelineState {
                    report: Some(report),
                    ..state
                }
            }
            Err(e) => {
                error!(error = %e, "Reporter stage failed");
                state.with_error(format!("Reporter error: {e}"))
            }
        }
    }

    /// Error terminal: produce the degraded report from accumulated errors.
    pub fn error_report(&self, state: PipelineState) -> PipelineState {
        error!(errors = ?state.errors, "Pipeline diverted to error terminal");
        PipelineState {
            report: Some(build_error_report(&state.errors)),
            ..state
        }
    }
}

/// Degraded-but-valid report listing all accumulated errors.
pub(crate) fn build_error_report(errors: &[String]) -> Report {
    Report {
        id: Uuid::new_v4().to_string(),
        title: ERROR_REPORT_TITLE.to_string(),
        date: Utc::now(),
        period: REPORT_PERIOD.to_string(),
        categories: Vec::new(),
        overall_summary: errors.join(", "),
    }
}

/// Absorb a per-item/per-category failure into a deterministic fallback.
///
/// The run continues and nothing reaches `state.errors` — that list is
/// reserved for stage-scoped failures.
fn or_fallback<T, E: std::fmt::Display>(
    what: &str,
    subject: &str,
    result: Result<T, E>,
    fallback: impl FnOnce() -> T,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(subject = %subject, error = %e, "Per-item {what} failed, using fallback");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_fallback_passes_through_success() {
        let value = or_fallback("analysis", "1", Ok::<_, String>(7), || 0);
        assert_eq!(value, 7);
    }

    #[test]
    fn or_fallback_substitutes_on_error() {
        let value = or_fallback("analysis", "1", Err::<i32, _>("boom".to_string()), || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn error_report_joins_errors_with_comma() {
        let report = build_error_report(&[
            "Collector error: a".to_string(),
            "Reporter error: b".to_string(),
        ]);
        assert_eq!(report.title, ERROR_REPORT_TITLE);
        assert_eq!(report.period, REPORT_PERIOD);
        assert!(report.categories.is_empty());
        assert_eq!(report.overall_summary, "Collector error: a, Reporter error: b");
    }
}
