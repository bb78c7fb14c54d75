//! Configuration management for multichat
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/multichat/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::history::DEFAULT_WINDOW;
use crate::core::error::{MultichatError, Result};
use crate::core::types::Temperament;

/// Main configuration for multichat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completion API configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Bot roster and participation defaults
    #[serde(default)]
    pub bots: BotsConfig,
    /// Conversation memory configuration
    #[serde(default)]
    pub history: HistoryConfig,
    /// Remote session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Polling bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// General flags
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Chat-completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key (empty means "not configured")
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Bot roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    /// How many bots from the roster take part
    pub count: usize,
    /// Default participation probability
    pub participation: f64,
    /// Default lower bound of the reply delay (inclusive)
    pub min_delay_ms: u64,
    /// Default upper bound of the reply delay (exclusive)
    pub max_delay_ms: u64,
    /// Available bot profiles
    pub roster: Vec<BotProfile>,
}

/// One configured bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotProfile {
    pub id: String,
    pub name: String,
    pub personality: String,
    pub color: String,
    pub temperament: Temperament,
    /// Overrides `bots.participation`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation: Option<f64>,
    /// Overrides `bots.min_delay_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delay_ms: Option<u64>,
    /// Overrides `bots.max_delay_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of recent turns kept besides the pinned system turn
    /// Default: 20
    pub window: usize,
}

/// Remote session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket endpoint of the multi-bot service
    pub url: String,
    /// Display name sent with every message
    pub user_name: String,
}

/// Polling bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interval between drains of the pending-result queue
    pub poll_interval_ms: u64,
    /// Consecutive drain failures before a degraded notification
    pub degraded_after: u32,
}

/// General flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.8,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            count: 3,
            participation: 0.7,
            min_delay_ms: 500,
            max_delay_ms: 2500,
            roster: default_roster(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            user_name: "user".to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            degraded_after: 5,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { debug: false }
    }
}

/// The built-in five-bot roster
pub fn default_roster() -> Vec<BotProfile> {
    let profile = |id: &str, name: &str, personality: &str, color: &str, t: Temperament| {
        BotProfile {
            id: id.to_string(),
            name: name.to_string(),
            personality: personality.to_string(),
            color: color.to_string(),
            temperament: t,
            participation: None,
            min_delay_ms: None,
            max_delay_ms: None,
        }
    };

    vec![
        profile(
            "bot_0",
            "Maimai",
            "a lively, cute assistant full of character",
            "#FF6B9D",
            Temperament::Playful,
        ),
        profile(
            "bot_1",
            "Xiaozhi",
            "a rigorous technical expert",
            "#4A90E2",
            Temperament::Analytical,
        ),
        profile(
            "bot_2",
            "Shishi",
            "a gentle, artistic poet",
            "#9B59B6",
            Temperament::Poetic,
        ),
        profile(
            "bot_3",
            "Ale",
            "a witty joke teller",
            "#F39C12",
            Temperament::Humorous,
        ),
        profile(
            "bot_4",
            "Xiaoyue",
            "a warm and attentive listener",
            "#E91E63",
            Temperament::Caring,
        ),
    ]
}

impl BotsConfig {
    /// The profiles that take part, honouring `count`
    pub fn active_profiles(&self) -> &[BotProfile] {
        let count = self.count.clamp(1, self.roster.len().max(1));
        &self.roster[..count.min(self.roster.len())]
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multichat")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let path = Self::config_file();
        let mut config = if path.exists() {
            match Self::load_from_path(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "ignoring config file: {}", e);
                    Self::default()
                }
            }
        } else {
            tracing::debug!("no config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    /// Overlay `MULTICHAT_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Overlay values from `lookup`; unset or unparsable values are skipped
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("MULTICHAT_API_KEY").or_else(|| lookup("DEEPSEEK_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Some(url) = lookup("MULTICHAT_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("MULTICHAT_MODEL") {
            self.llm.model = model;
        }
        if let Some(count) = lookup("MULTICHAT_BOT_COUNT").and_then(|c| c.parse().ok()) {
            self.bots.count = count;
        }
        if let Some(url) = lookup("MULTICHAT_SESSION_URL") {
            self.session.url = url;
        }
        if let Some(name) = lookup("MULTICHAT_USER_NAME") {
            self.session.user_name = name;
        }
        if let Some(debug) = lookup("MULTICHAT_DEBUG") {
            self.general.debug = debug == "true" || debug == "1";
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MultichatError::config("Config file not found"));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| MultichatError::config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MultichatError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file())
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                MultichatError::config(format!("Failed to create config dir: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MultichatError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| MultichatError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Whether an API key has been configured
    pub fn has_api_key(&self) -> bool {
        !self.llm.api_key.trim().is_empty()
    }

    /// Stable per-device user id, generated on first use
    pub fn load_or_create_user_id() -> Result<String> {
        Self::user_id_at(&Self::config_dir().join("user_id"))
    }

    /// Read the user id stored at `path`, creating it if missing
    pub fn user_id_at(path: &Path) -> Result<String> {
        if let Ok(existing) = fs::read_to_string(path) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(existing.to_string());
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &id)?;
        tracing::info!(user_id = %id, "generated new user id");
        Ok(id)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
