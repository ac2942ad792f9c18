//! DueBot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DueBotError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DueBotConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl DueBotConfig {
    /// Load config from the default path (~/.duebot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DueBotError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DueBotError::Config(format!("Failed to parse config: {e}")))
    }

    /// Overlay `BOT_TOKEN` and `OPENAI_API_KEY` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("BOT_TOKEN").ok(),
            std::env::var("OPENAI_API_KEY").ok(),
        );
    }

    fn apply_overrides(&mut self, bot_token: Option<String>, ai_key: Option<String>) {
        if let Some(token) = bot_token.filter(|t| !t.is_empty()) {
            self.bot_token = token;
        }
        if let Some(key) = ai_key.filter(|k| !k.is_empty()) {
            self.ai.api_key = key;
        }
    }

    /// Check the fields the bot cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(DueBotError::Config(
                "bot token missing (set BOT_TOKEN or bot_token in config)".into(),
            ));
        }
        self.digest.hour_minute()?;
        if self.digest.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(DueBotError::Config(format!(
                "digest.utc_offset_minutes out of range: {}",
                self.digest.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the DueBot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".duebot")
    }
}

/// Telegram polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Seconds to wait between `getUpdates` calls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

/// OpenAI-compatible backend for `/ask`. An empty key disables the command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".into()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Daily digest timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Local time of day as `HH:MM`.
    #[serde(default = "default_digest_time")]
    pub time: String,
    /// Offset of the bot's local day from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Skip the message for users with nothing pending.
    #[serde(default)]
    pub skip_idle: bool,
}

fn default_digest_time() -> String {
    "08:00".into()
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            time: default_digest_time(),
            utc_offset_minutes: 0,
            skip_idle: false,
        }
    }
}

impl DigestConfig {
    /// Parse `time` into (hour, minute).
    pub fn hour_minute(&self) -> Result<(u32, u32)> {
        let bad = || DueBotError::Config(format!("digest.time must be HH:MM, got '{}'", self.time));
        let (h, m) = self.time.trim().split_once(':').ok_or_else(bad)?;
        let hour: u32 = h.parse().map_err(|_| bad())?;
        let minute: u32 = m.parse().map_err(|_| bad())?;
        if hour > 23 || minute > 59 {
            return Err(bad());
        }
        Ok((hour, minute))
    }
}

/// Task persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Done tasks older than this are pruned by the daily sweep. 0 keeps them.
    #[serde(default = "default_retain_done_days")]
    pub retain_done_days: u32,
}

fn bool_true() -> bool {
    true
}

fn default_store_path() -> String {
    "~/.duebot/tasks.json".into()
}

fn default_retain_done_days() -> u32 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_store_path(),
            retain_done_days: default_retain_done_days(),
        }
    }
}

impl StoreConfig {
    /// Store path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}
