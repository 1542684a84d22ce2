//! Configuration loading, validation, and management for parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Job queue and worker pool
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Agent loop
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tools available in agent mode
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Chat history persistence
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_provider() -> String {
    "dashscope".into()
}
fn default_model() -> String {
    "qwen-plus".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("dispatch", &self.dispatch)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("history", &self.history)
            .finish()
    }
}

/// Per-provider overrides.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8088
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of concurrent workers consuming the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_name")]
    pub queue_name: String,
}

fn default_workers() -> usize {
    5
}
fn default_queue_name() -> String {
    "chat_queue".into()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_name: default_queue_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Step budget for one ReAct run.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Register the Exa web search tool.
    #[serde(default = "default_true")]
    pub web_search: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exa_api_key: Option<String>,

    #[serde(default = "default_exa_api_url")]
    pub exa_api_url: String,

    #[serde(default = "default_num_results")]
    pub num_results: u32,
}

fn default_exa_api_url() -> String {
    "https://api.exa.ai/search".into()
}
fn default_num_results() -> u32 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            exa_api_key: None,
            exa_api_url: default_exa_api_url(),
            num_results: default_num_results(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("web_search", &self.web_search)
            .field("exa_api_key", &redact(&self.exa_api_key))
            .field("exa_api_url", &self.exa_api_url)
            .field("num_results", &self.num_results)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// SQLite database file. Defaults to `~/.parley/history.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_history_backend() -> String {
    "sqlite".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            path: None,
        }
    }
}

impl HistoryConfig {
    /// The database path, falling back to the config directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("history.db"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (`~/.parley/config.toml`).
    ///
    /// Also checks environment variables for API keys:
    /// - `PARLEY_API_KEY` (highest priority)
    /// - `DASHSCOPE_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PARLEY_API_KEY")
                .or_else(|| lookup("DASHSCOPE_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("PARLEY_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("PARLEY_MODEL") {
            self.default_model = model;
        }

        if self.tools.exa_api_key.is_none() {
            self.tools.exa_api_key = lookup("EXA_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.dispatch.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.workers must be at least 1".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if !matches!(self.history.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown history backend '{}' (expected \"sqlite\" or \"memory\")",
                self.history.backend
            )));
        }

        Ok(())
    }

    /// The API key for `provider`: its own entry first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            dispatch: DispatchConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for parley_core::Error {
    fn from(e: ConfigError) -> Self {
        parley_core::Error::config(e.to_string())
    }
}
