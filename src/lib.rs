//! news-digest — Telegram channel digest bot.

pub mod bot;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod sources;
