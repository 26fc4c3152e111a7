//! Domain types shared across the pipeline, sources, and bot.
//!
//! These are the data contracts between the five pipeline stages:
//! raw post → analysis → category assignment → category summary → report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Raw post ────────────────────────────────────────────────────────

/// A single fetched channel post, prior to any analysis.
///
/// Immutable once fetched — every downstream stage carries it along
/// unchanged so the final report can list the originals verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Channel-native message ID.
    pub id: String,
    /// Channel the post came from (e.g. "@technews").
    pub channel: String,
    /// Post body.
    pub text: String,
    /// When the post was published.
    pub date: DateTime<Utc>,
    /// Attached media URLs, if any.
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// View count, when the channel exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

// ── Analysis ────────────────────────────────────────────────────────

/// Per-post analysis result from the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// 5–7 key terms extracted from the post.
    pub keywords: Vec<String>,
    /// Sentiment label ("positive", "neutral", "negative").
    pub sentiment: String,
    /// Importance score in [0, 1].
    pub importance_score: f32,
}

impl Analysis {
    /// Deterministic fallback used when the per-post analysis call fails.
    pub fn fallback() -> Self {
        Self {
            keywords: vec!["news".to_string()],
            sentiment: "neutral".to_string(),
            importance_score: 0.5,
        }
    }
}

/// An analysis paired with the post it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedNews {
    pub analysis: Analysis,
    pub item: NewsItem,
}

// ── Categories ──────────────────────────────────────────────────────

/// Closed category set for classification.
///
/// The classifier only ever emits one of these; anything the LLM returns
/// outside the set is a classification failure and falls back to the
/// catch-all [`Category::Society`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Economics,
    Technology,
    Science,
    Sports,
    Culture,
    Society,
    Incidents,
}

impl Category {
    /// Every category, in display order (used for prompt construction).
    pub const ALL: [Category; 8] = [
        Category::Politics,
        Category::Economics,
        Category::Technology,
        Category::Science,
        Category::Sports,
        Category::Culture,
        Category::Society,
        Category::Incidents,
    ];

    /// Catch-all category for posts the classifier cannot place.
    pub const FALLBACK: Category = Category::Society;

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Economics => "Economics",
            Category::Technology => "Technology",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Culture => "Culture",
            Category::Society => "Society",
            Category::Incidents => "Incidents",
        }
    }

    /// Parse a label, case-insensitively. Unknown labels return `None` —
    /// they must never leak into the report.
    pub fn from_label(label: &str) -> Option<Category> {
        let trimmed = label.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Summaries & report ──────────────────────────────────────────────

/// Summary of one category's posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub summary: String,
    /// Number of posts summarized. Always equals the category's bucket
    /// size at the time the summary was created.
    pub news_count: usize,
}

/// One category section of the final report, with the original posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub category: Category,
    pub summary: String,
    pub news_count: usize,
    pub items: Vec<NewsItem>,
}

/// The digest produced by a pipeline run.
///
/// Created exactly once per run — either by the reporter stage or by the
/// error terminal — and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Period label the digest covers.
    pub period: String,
    pub categories: Vec<ReportSection>,
    pub overall_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(Category::from_label("technology"), Some(Category::Technology));
        assert_eq!(Category::from_label("SPORTS"), Some(Category::Sports));
        assert_eq!(Category::from_label("  Culture  "), Some(Category::Culture));
    }

    #[test]
    fn category_parse_rejects_unknown_labels() {
        assert_eq!(Category::from_label("Weather"), None);
        assert_eq!(Category::from_label(""), None);
        assert_eq!(Category::from_label("Tech"), None);
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::Incidents).unwrap();
        assert_eq!(json, "\"Incidents\"");
    }

    #[test]
    fn analysis_fallback_is_deterministic() {
        let a = Analysis::fallback();
        let b = Analysis::fallback();
        assert_eq!(a, b);
        assert_eq!(a.keywords, vec!["news"]);
        assert_eq!(a.sentiment, "neutral");
        assert!((a.importance_score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn news_item_serde_round_trip() {
        let item = NewsItem {
            id: "42".into(),
            channel: "@test".into(),
            text: "Rust 2.0 released".into(),
            date: Utc::now(),
            media_urls: vec![],
            views: Some(1200),
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: NewsItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
