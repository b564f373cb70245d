use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the bearer credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Main application configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bearer credential. The environment variable wins when both are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name sent with every request
    pub model: String,

    /// Full URL of the chat-completion endpoint
    pub endpoint: String,

    /// Replay earlier turns with each request instead of only the latest input
    pub send_history: bool,

    /// Request timeout; `None` keeps the HTTP client's default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Filter directive used when RUST_LOG is unset
    pub log_filter: String,

    /// Log file location; defaults to parley.log in the parley home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "Hello, ChatGPT!".to_string(),
            tick_rate_ms: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            send_history: false,
            request_timeout_secs: None,
            log_filter: "parley=info".to_string(),
            log_file: None,
            ui: UiConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("send_history", &self.send_history)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_filter", &self.log_filter)
            .field("log_file", &self.log_file)
            .field("ui", &self.ui)
            .finish()
    }
}

impl Config {
    /// Directory holding config.toml and the log file
    pub fn parley_home() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".parley"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::parley_home()?.join("config.toml"))
    }

    /// Load configuration from a specific file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get API key from environment or config
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Resolved log file path
    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::parley_home()?.join("parley.log")),
        }
    }

    /// Render the effective configuration with the credential masked
    pub fn describe(&self) -> String {
        let from_env = std::env::var(API_KEY_ENV)
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        let credential = if from_env {
            format!("set (from {})", API_KEY_ENV)
        } else if self.has_api_key() {
            "set (from config file)".to_string()
        } else {
            "not set".to_string()
        };
        let timeout = self
            .request_timeout_secs
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "client default".to_string());

        format!(
            "model:        {}\nendpoint:     {}\napi key:      {}\nhistory:      {}\ntimeout:      {}\nlog filter:   {}",
            self.model,
            self.endpoint,
            credential,
            if self.send_history { "full conversation" } else { "latest message only" },
            timeout,
            self.log_filter,
        )
    }
}
