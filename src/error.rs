//! Error types for news-digest.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Telegram channel errors — both fetching posts and sending replies.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Fetch from {channel} failed: {reason}")]
    FetchFailed { channel: String, reason: String },

    #[error("Failed to send message: {reason}")]
    SendFailed { reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid update payload: {0}")]
    InvalidUpdate(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Channel-list persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
