//! Pipeline state threaded through the stages.
//!
//! Each stage consumes the state by value and returns a complete new
//! state with its own output field filled in. Nothing is mutated in
//! place across stage boundaries, so any stage can be tested in
//! isolation with a hand-built state.

use crate::models::{AnalyzedNews, Category, CategorySummary, NewsItem, Report};

/// The accumulating state of one digest run.
///
/// `errors` is append-only; `report` is set exactly once, by the
/// reporter stage or the error terminal.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Channels to collect from, in input order. Set once.
    pub channels: Vec<String>,
    /// Cap on posts fetched per channel.
    pub limit_per_channel: usize,
    /// Output of the collector stage.
    pub collected: Vec<NewsItem>,
    /// Output of the analyzer stage.
    pub analyzed: Vec<AnalyzedNews>,
    /// Output of the classifier stage.
    pub categorized: CategoryBuckets,
    /// Output of the summarizer stage.
    pub summaries: Vec<CategorySummary>,
    /// The final digest, absent until the reporter or error terminal runs.
    pub report: Option<Report>,
    /// Stage-level error descriptions, in occurrence order.
    pub errors: Vec<String>,
}

impl PipelineState {
    /// Fresh initial state for one run.
    pub fn new(channels: Vec<String>, limit_per_channel: usize) -> Self {
        Self {
            channels,
            limit_per_channel,
            ..Self::default()
        }
    }

    /// Append a stage-level error, keeping everything else intact.
    pub fn with_error(mut self, message: String) -> Self {
        self.errors.push(message);
        self
    }

    /// Routing predicate: divert to the error terminal iff any stage
    /// has recorded an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Insertion-ordered mapping from category to its classified posts.
///
/// A bucket is created lazily the first time its category appears, and
/// iteration follows first-appearance order, which keeps summaries and
/// report sections deterministic for a given classification sequence.
#[derive(Debug, Clone, Default)]
pub struct CategoryBuckets {
    buckets: Vec<(Category, Vec<AnalyzedNews>)>,
}

impl CategoryBuckets {
    /// Append an entry to its category's bucket.
    pub fn push(&mut self, category: Category, entry: AnalyzedNews) {
        match self.buckets.iter_mut().find(|(c, _)| *c == category) {
            Some((_, bucket)) => bucket.push(entry),
            None => self.buckets.push((category, vec![entry])),
        }
    }

    /// Entries for one category, if any were classified into it.
    pub fn get(&self, category: Category) -> Option<&[AnalyzedNews]> {
        self.buckets
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, bucket)| bucket.as_slice())
    }

    /// Iterate buckets in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[AnalyzedNews])> {
        self.buckets.iter().map(|(c, bucket)| (*c, bucket.as_slice()))
    }

    /// Number of non-empty categories.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total entries across all buckets.
    pub fn total_items(&self) -> usize {
        self.buckets.iter().map(|(_, bucket)| bucket.len()).sum()
    }
}
