use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Channel that receives published articles
    #[serde(default)]
    pub channel_id: i64,
    /// Chat that receives operational error reports (unset = reports disabled)
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_base_url: String,
    /// Timeout for a single sendMessage call in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: 0,
            admin_chat_id: None,
            api_base_url: default_telegram_api_url(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between fetch cycles in seconds
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
    /// Interval between publish attempts in seconds
    #[serde(default = "default_publish_interval")]
    pub publish_interval_secs: u64,
    /// Maximum article age eligible for publishing (defaults to twice the fetch interval)
    #[serde(default)]
    pub lookback_secs: Option<u64>,
    /// Feed request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Article page request timeout in seconds
    #[serde(default = "default_timeout")]
    pub page_timeout_secs: u64,
    /// Timeout for probing a feed before it is added
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Items whose title contains (or whose category equals) any keyword are skipped
    #[serde(default)]
    pub filter_keywords: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_fetch_interval(),
            publish_interval_secs: default_publish_interval(),
            lookback_secs: None,
            request_timeout_secs: default_timeout(),
            page_timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            filter_keywords: Vec::new(),
        }
    }
}

impl SyncConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs.max(1))
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs.max(1))
    }

    pub fn lookback(&self) -> Duration {
        match self.lookback_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.fetch_interval() * 2,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// AI provider: "ollama" or "openai"
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    /// Ollama address, or an OpenAI-compatible base URL (empty = api.openai.com)
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key (openai provider)
    #[serde(default)]
    pub api_key: Option<String>,
    /// System prompt describing the summary style
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Summarization timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            base_url: None,
            api_key: None,
            prompt: default_prompt(),
            model: default_model(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_addr")]
    pub bind_addr: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_addr: default_health_addr(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedpost")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_send_timeout() -> u64 {
    30
}

fn default_fetch_interval() -> u64 {
    600 // 10 minutes
}

fn default_publish_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    15
}

fn default_ai_provider() -> String {
    "ollama".to_string()
}

fn default_prompt() -> String {
    concat!(
        "Summarize the following article in 2-3 sentences. ",
        "Be concise and focus on the key points."
    )
    .to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_ai_timeout() -> u64 {
    300 // 5 minutes, local models can be slow
}

fn default_health_addr() -> String {
    "127.0.0.1:8088".to_string()
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

const ENV_PREFIX: &str = "FEEDPOST_";

impl AppConfig {
    /// Load configuration from the default path, or return defaults if it does not exist
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, then apply environment overrides
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Override secrets and destinations from `FEEDPOST_*` variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(id) = var("TELEGRAM_CHANNEL_ID") {
            self.telegram.channel_id = parse_chat_id("TELEGRAM_CHANNEL_ID", &id)?;
        }
        if let Some(id) = var("TELEGRAM_ADMIN_CHAT_ID") {
            self.telegram.admin_chat_id = Some(parse_chat_id("TELEGRAM_ADMIN_CHAT_ID", &id)?);
        }
        if let Some(key) = var("AI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(url) = var("AI_BASE_URL") {
            self.ai.base_url = Some(url);
        }

        Ok(())
    }

    /// Check the settings the publish side cannot run without
    pub fn validate_for_publishing(&self) -> crate::Result<()> {
        if self.telegram.bot_token.as_deref().unwrap_or("").is_empty() {
            return Err(crate::Error::Config("telegram.bot_token is required".to_string()));
        }
        if self.telegram.channel_id == 0 {
            return Err(crate::Error::Config("telegram.channel_id is required".to_string()));
        }
        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/feedpost/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("feedpost")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("feedpost.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Admin chat for error reports, if configured
    pub fn admin_chat(&self) -> Option<i64> {
        self.telegram.admin_chat_id.filter(|id| *id != 0)
    }
}

fn parse_chat_id(name: &str, value: &str) -> crate::Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            crate::Error::Config(format!("{ENV_PREFIX}{name} must be an integer, got '{value}'"))
        })
}
