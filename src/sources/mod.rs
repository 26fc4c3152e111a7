//! News sources — pure fetch I/O, no analysis logic.

pub mod telegram;

pub use telegram::TelegramSource;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::models::NewsItem;

/// Trait for post sources the collector stage fetches from.
///
/// A fetch is all-or-nothing for the requested channel: either the
/// recent posts come back as a batch, or the whole call fails.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Source name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent posts from `channel`.
    async fn fetch(&self, channel: &str, limit: usize) -> Result<Vec<NewsItem>, ChannelError>;
}
