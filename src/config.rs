use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::Deserialize;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration, handed to each client at construction
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub model: Option<String>,
    pub lang: Option<String>,
    pub timeout_secs: Option<u64>,
    pub youtube_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub youtube_base_url: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Overlay values from the process environment
    pub fn with_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| keys.iter().copied().find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()));

        if let Some(key) = first(&["YOUTUBE_API_KEY", "YT_KEY"]) {
            self.youtube_api_key = Some(key);
        }
        if let Some(key) = first(&["OPENAI_API_KEY", "OPENAI_KEY"]) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = first(&["ANTHROPIC_API_KEY"]) {
            self.anthropic_api_key = Some(key);
        }
        if let Some(port) = first(&["PORT"]) {
            self.bind = Some(format!("0.0.0.0:{}", port.trim()));
        }
        self
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_LANG)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// HTTP client with the per-request timeout applied
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.timeout()).build()
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}
