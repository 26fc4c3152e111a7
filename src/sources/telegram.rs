//! Telegram news source over the Bot API.
//!
//! The Bot API cannot read arbitrary channel history, so the source
//! harvests `channel_post` updates (the bot must be a member of the
//! channels it digests) into a per-channel cache of recent posts and
//! serves fetches from that cache.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ChannelError;
use crate::models::NewsItem;
use crate::sources::NewsSource;

/// Recent posts kept per channel.
const CACHE_CAP_PER_CHANNEL: usize = 200;

/// Telegram-backed news source.
pub struct TelegramSource {
    bot_token: String,
    client: reqwest::Client,
    inner: Mutex<Harvest>,
}

/// Update offset and the per-channel post cache, guarded together so a
/// fetch sees a consistent harvest.
#[derive(Default)]
struct Harvest {
    offset: i64,
    cache: HashMap<String, Vec<NewsItem>>,
}

impl TelegramSource {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
            inner: Mutex::new(Harvest::default()),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Drain pending updates into the harvest cache.
    async fn harvest_updates(&self, harvest: &mut Harvest) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "offset": harvest.offset,
            "timeout": 0,
            "allowed_updates": ["channel_post"],
        });

        let response = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Http(format!(
                "getUpdates returned {}",
                response.status()
            )));
        }

        let parsed: GetUpdatesResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidUpdate(e.to_string()))?;

        if !parsed.ok {
            return Err(ChannelError::InvalidUpdate(
                parsed.description.unwrap_or_else(|| "ok=false".to_string()),
            ));
        }

        for update in parsed.result {
            harvest.offset = harvest.offset.max(update.update_id + 1);
            if let Some(post) = update.channel_post
                && let Some(item) = post_to_item(post)
            {
                let bucket = harvest.cache.entry(item.channel.clone()).or_default();
                bucket.push(item);
                if bucket.len() > CACHE_CAP_PER_CHANNEL {
                    bucket.remove(0);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl NewsSource for TelegramSource {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn fetch(&self, channel: &str, limit: usize) -> Result<Vec<NewsItem>, ChannelError> {
        let key = channel_key(channel);
        let mut harvest = self.inner.lock().await;

        self.harvest_updates(&mut harvest)
            .await
            .map_err(|e| ChannelError::FetchFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let posts = harvest.cache.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let start = posts.len().saturating_sub(limit);
        let items = posts[start..].to_vec();

        debug!(channel = %channel, count = items.len(), "Fetched posts");
        Ok(items)
    }
}

/// Canonical cache key for a channel reference ("@name" form).
fn channel_key(channel: &str) -> String {
    let trimmed = channel.trim();
    if let Some(stripped) = trimmed.strip_prefix('@') {
        format!("@{}", stripped.to_lowercase())
    } else {
        format!("@{}", trimmed.to_lowercase())
    }
}

/// Convert a channel post to a [`NewsItem`]. Posts without text (pure
/// media) are skipped, matching the collector's contract.
fn post_to_item(post: Post) -> Option<NewsItem> {
    let text = post.text?;
    let username = post.chat.username?;
    Some(NewsItem {
        id: post.message_id.to_string(),
        channel: channel_key(&username),
        text,
        date: DateTime::<Utc>::from_timestamp(post.date, 0).unwrap_or_else(Utc::now),
        media_urls: Vec::new(),
        views: post.views,
    })
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    channel_post: Option<Post>,
}

#[derive(Deserialize)]
struct Post {
    message_id: i64,
    date: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    views: Option<u64>,
    chat: Chat,
}

#[derive(Deserialize)]
struct Chat {
    #[serde(default)]
    username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_key_normalizes_forms() {
        assert_eq!(channel_key("@TechNews"), "@technews");
        assert_eq!(channel_key("technews"), "@technews");
        assert_eq!(channel_key("  @TechNews  "), "@technews");
    }

    #[test]
    fn post_to_item_maps_fields() {
        let post: Post = serde_json::from_str(
            r#"{
                "message_id": 99,
                "date": 1735689600,
                "text": "Release day",
                "views": 420,
                "chat": {"username": "TechNews"}
            }"#,
        )
        .unwrap();
        let item = post_to_item(post).unwrap();
        assert_eq!(item.id, "99");
        assert_eq!(item.channel, "@technews");
        assert_eq!(item.text, "Release day");
        assert_eq!(item.views, Some(420));
    }

    #[test]
    fn post_to_item_skips_textless_posts() {
        let post: Post = serde_json::from_str(
            r#"{"message_id": 1, "date": 0, "chat": {"username": "x"}}"#,
        )
        .unwrap();
        assert!(post_to_item(post).is_none());
    }

    #[test]
    fn updates_wire_format_parses() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "channel_post": {
                    "message_id": 1, "date": 100, "text": "hi",
                    "chat": {"username": "a"}
                }},
                {"update_id": 8}
            ]
        }"#;
        let parsed: GetUpdatesResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 2);
        assert!(parsed.result[1].channel_post.is_none());
    }
}
