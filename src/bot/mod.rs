//! Telegram bot front-end — long-polls the Bot API for commands.
//!
//! Commands manage a per-user channel list and trigger digest runs:
//! /add, /remove, /list, /digest, /start, /help.

pub mod format;
pub mod store;

pub use format::format_report;
pub use store::ChannelStore;

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::ChannelError;
use crate::pipeline::DigestPipeline;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

const HELP_TEXT: &str = "🤖 I build digests of your Telegram channels.\n\n\
    /add <channel> — add a channel (e.g. @technews or https://t.me/technews)\n\
    /remove <channel> — remove a channel\n\
    /list — show your channels\n\
    /digest — collect and summarize the latest posts\n\
    /help — this message";

/// The digest bot: command handling and report delivery.
pub struct DigestBot {
    bot_token: String,
    client: reqwest::Client,
    pipeline: Arc<DigestPipeline>,
    store: ChannelStore,
    limit_per_channel: usize,
    max_channels_per_user: usize,
}

impl DigestBot {
    pub fn new(
        bot_token: String,
        pipeline: Arc<DigestPipeline>,
        store: ChannelStore,
        limit_per_channel: usize,
        max_channels_per_user: usize,
    ) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
            pipeline,
            store,
            limit_per_channel,
            max_channels_per_user,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Run the long-polling command loop. Only returns on repeated
    /// transport failure at startup; in-loop errors are logged and retried.
    pub async fn run(&self) -> Result<(), ChannelError> {
        info!("Digest bot started");
        let mut offset: i64 = 0;

        loop {
            let updates = match self.poll_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else {
                    continue;
                };
                let (Some(text), Some(from)) = (message.text, message.from) else {
                    continue;
                };

                if let Err(e) = self
                    .handle_command(message.chat.id, &from.id.to_string(), text.trim())
                    .await
                {
                    error!(error = %e, "Command handling failed");
                }
            }
        }
    }

    async fn poll_updates(&self, offset: i64) -> Result<Vec<Update>, ChannelError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
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

        Ok(parsed.result)
    }

    async fn handle_command(
        &self,
        chat_id: i64,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let (command, argument) = split_command(text);

        match command {
            "/start" | "/help" => self.send_message(chat_id, HELP_TEXT).await,
            "/add" => {
                let Some(raw) = argument else {
                    return self
                        .send_message(chat_id, "Usage: /add @channel")
                        .await;
                };
                let channel = normalize_channel(raw);
                if self.store.list(user_id).await.len() >= self.max_channels_per_user {
                    return self
                        .send_message(
                            chat_id,
                            &format!(
                                "❌ Channel limit reached ({} max).",
                                self.max_channels_per_user
                            ),
                        )
                        .await;
                }
                let added = self
                    .store
                    .add(user_id, &channel)
                    .await
                    .map_err(|e| ChannelError::SendFailed {
                        reason: format!("store error: {e}"),
                    })?;
                let reply = if added {
                    format!("✅ Channel {channel} added.")
                } else {
                    format!("❌ Channel {channel} is already on your list.")
                };
                self.send_message(chat_id, &reply).await
            }
            "/remove" => {
                let Some(raw) = argument else {
                    return self
                        .send_message(chat_id, "Usage: /remove @channel")
                        .await;
                };
                let channel = normalize_channel(raw);
                let removed = self
                    .store
                    .remove(user_id, &channel)
                    .await
                    .map_err(|e| ChannelError::SendFailed {
                        reason: format!("store error: {e}"),
                    })?;
                let reply = if removed {
                    format!("Channel {channel} removed.")
                } else {
                    format!("Channel {channel} is not on your list.")
                };
                self.send_message(chat_id, &reply).await
            }
            "/list" => {
                let channels = self.store.list(user_id).await;
                let reply = if channels.is_empty() {
                    "You have no channels yet. Add one with /add @channel".to_string()
                } else {
                    let lines: Vec<String> = channels
                        .iter()
                        .enumerate()
                        .map(|(i, c)| format!("{}. {c}", i + 1))
                        .collect();
                    format!("Your channels:\n{}", lines.join("\n"))
                };
                self.send_message(chat_id, &reply).await
            }
            "/digest" => {
                let channels = self.store.list(user_id).await;
                if channels.is_empty() {
                    return self
                        .send_message(
                            chat_id,
                            "You have no channels yet. Add one with /add @channel",
                        )
                        .await;
                }

                self.send_message(chat_id, "⏳ Collecting and summarizing, please wait...")
                    .await?;

                let report = self.pipeline.run(channels, self.limit_per_channel).await;
                self.send_message(chat_id, &format_report(&report)).await
            }
            _ => {
                self.send_message(chat_id, "Unknown command. Try /help.")
                    .await
            }
        }
    }

    /// Send a text message, Markdown first with plain-text fallback.
    /// Splits messages exceeding Telegram's 4096 char limit.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_chunk(chat_id, &chunk).await?;
        }
        Ok(())
    }

    async fn send_chunk(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        warn!(
            status = ?markdown_resp.status(),
            "sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let detail = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                reason: format!("sendMessage failed: {detail}"),
            });
        }

        Ok(())
    }
}

/// Split a command message into the command and its argument.
fn split_command(text: &str) -> (&str, Option<&str>) {
    match text.split_once(char::is_whitespace) {
        Some((command, rest)) => {
            let rest = rest.trim();
            (command, (!rest.is_empty()).then_some(rest))
        }
        None => (text, None),
    }
}

/// Normalize a channel reference to the "@name" form.
///
/// Accepts "@name", bare "name", and "https://t.me/name" links.
fn normalize_channel(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    let name = trimmed
        .strip_prefix("https://t.me/")
        .or_else(|| trimmed.strip_prefix("t.me/"))
        .unwrap_or(trimmed);
    let name = name.strip_prefix('@').unwrap_or(name);
    format!("@{name}")
}

/// Split text into chunks that fit Telegram's message length limit,
/// preferring line boundaries.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        // A single oversized line gets hard-split.
        if line.chars().count() > max_len {
            let mut buf = String::new();
            for c in line.chars() {
                if buf.chars().count() == max_len {
                    chunks.push(std::mem::take(&mut buf));
                }
                buf.push(c);
            }
            current = buf;
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GetUpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct User {
    id: i64,
}
