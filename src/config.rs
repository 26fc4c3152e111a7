//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_BASE_URL, LlmConfig};

/// Default model when LLM_MODEL is not set.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: String,
    /// LLM provider settings.
    pub llm: LlmConfig,
    /// Posts fetched per channel per digest run.
    pub default_limit_per_channel: usize,
    /// Cap on channels a single user may subscribe to.
    pub max_channels_per_user: usize,
    /// Directory for the channel-list store.
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let api_key = required(&lookup, "LLM_API_KEY")?;

        Ok(Self {
            bot_token,
            llm: LlmConfig {
                base_url: lookup("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key: SecretString::from(api_key),
                model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            default_limit_per_channel: parsed_or(&lookup, "DEFAULT_LIMIT_PER_CHANNEL", 10)?,
            max_channels_per_user: parsed_or(&lookup, "MAX_CHANNELS_PER_USER", 20)?,
            data_dir: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "./data".to_string())),
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, ConfigError> {
    lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parsed_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: name.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn minimal_env_gets_defaults() {
        let env = vars(&[("TELEGRAM_BOT_TOKEN", "tok"), ("LLM_API_KEY", "key")]);
        let config = Config::from_lookup(|n| env.get(n).cloned()).unwrap();
        assert_eq!(config.bot_token, "tok");
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.default_limit_per_channel, 10);
        assert_eq!(config.max_channels_per_user, 20);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn missing_required_var_errors() {
        let env = vars(&[("LLM_API_KEY", "key")]);
        let err = Config::from_lookup(|n| env.get(n).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn overrides_are_honored() {
        let env = vars(&[
            ("TELEGRAM_BOT_TOKEN", "tok"),
            ("LLM_API_KEY", "key"),
            ("LLM_BASE_URL", "https://gigachat.example/v1"),
            ("LLM_MODEL", "GigaChat-2-Max"),
            ("DEFAULT_LIMIT_PER_CHANNEL", "25"),
            ("MAX_CHANNELS_PER_USER", "5"),
        ]);
        let config = Config::from_lookup(|n| env.get(n).cloned()).unwrap();
        assert_eq!(config.llm.base_url, "https://gigachat.example/v1");
        assert_eq!(config.llm.model, "GigaChat-2-Max");
        assert_eq!(config.default_limit_per_channel, 25);
        assert_eq!(config.max_channels_per_user, 5);
    }

    #[test]
    fn invalid_number_errors() {
        let env = vars(&[
            ("TELEGRAM_BOT_TOKEN", "tok"),
            ("LLM_API_KEY", "key"),
            ("DEFAULT_LIMIT_PER_CHANNEL", "lots"),
        ]);
        let err = Config::from_lookup(|n| env.get(n).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "DEFAULT_LIMIT_PER_CHANNEL"));
    }
}
