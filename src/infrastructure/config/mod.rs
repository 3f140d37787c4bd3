//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::{DispatchMode, DispatcherOptions};

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub dispatcher: DispatcherConfig,
    pub replies: RepliesConfig,
    pub storage: StorageConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "link-tracker-bot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatcherConfig {
    pub mode: DispatchMode,
    pub max_in_flight: usize,
    pub shutdown_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Concurrent,
            max_in_flight: 64,
            shutdown_timeout_seconds: 10,
        }
    }
}

impl DispatcherConfig {
    pub fn options(&self) -> DispatcherOptions {
        DispatcherOptions {
            mode: self.mode,
            max_in_flight: self.max_in_flight,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepliesConfig {
    /// Reply to free-form text; unset means stay silent
    pub plain_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    pub max_links_per_chat: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_links_per_chat: Some(100),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub poll_timeout_seconds: u64,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            poll_timeout_seconds: 30,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue(
                "dispatcher.max-in-flight must be at least 1".to_string(),
            ));
        }
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bot.name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides on top of this config
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.set_token(token);
        }

        if let Ok(mode) = std::env::var("BOT_DISPATCH_MODE") {
            self.dispatcher.mode = match mode.as_str() {
                "sequential" => DispatchMode::Sequential,
                "concurrent" => DispatchMode::Concurrent,
                other => {
                    return Err(ConfigError::InvalidValue(format!("BOT_DISPATCH_MODE={}", other)))
                }
            };
        }

        Ok(self)
    }

    pub fn set_token(&mut self, token: String) {
        let telegram = self.adapters.telegram.get_or_insert_with(TelegramConfig::default);
        telegram.token = Some(token);
        telegram.enabled = true;
    }

    /// Token of an enabled Telegram adapter, if any
    pub fn telegram_token(&self) -> Option<&str> {
        self.adapters
            .telegram
            .as_ref()
            .filter(|t| t.enabled)
            .and_then(|t| t.token.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.name, "link-tracker-bot");
        assert_eq!(config.dispatcher.mode, DispatchMode::Concurrent);
        assert_eq!(config.dispatcher.options().shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.storage.max_links_per_chat, Some(100));
        assert!(config.replies.plain_text.is_none());
        assert!(config.telegram_token().is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
bot:
  name: tracker
dispatcher:
  mode: sequential
  shutdown-timeout-seconds: 3
replies:
  plain-text: "Send /help to see what I can do."
adapters:
  telegram:
    enabled: true
    token: "123:abc"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.bot.name, "tracker");
        assert_eq!(config.dispatcher.mode, DispatchMode::Sequential);
        assert_eq!(config.dispatcher.max_in_flight, 64);
        assert_eq!(config.dispatcher.options().shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.replies.plain_text.as_deref(), Some("Send /help to see what I can do."));
        assert_eq!(config.telegram_token(), Some("123:abc"));
        assert_eq!(config.adapters.telegram.unwrap().poll_timeout_seconds, 30);
    }

    #[test]
    fn test_disabled_telegram_has_no_token() {
        let yaml = "adapters:\n  telegram:\n    enabled: false\n    token: \"123:abc\"\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.telegram_token().is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_yaml("dispatcher:\n  max-in-flight: 0\n"),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            Config::from_yaml("dispatcher:\n  mode: parallel\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_default_yaml_parses_back() {
        let yaml = Config::default().to_yaml().unwrap();
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.bot.name, "link-tracker-bot");
    }

    #[test]
    fn test_set_token_enables_telegram() {
        let mut config = Config::default();
        config.set_token("42:xyz".to_string());
        assert_eq!(config.telegram_token(), Some("42:xyz"));
    }
}
