//! Configuration loading, validation, and management for LLMpu.
//!
//! Loads configuration from `~/.llmpu/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use llmpu_formatters::{Personas, PromptFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session types the sessions crate knows how to build.
pub const SESSION_TYPES: &[&str] = &["openai_compatible"];

/// The root configuration structure.
///
/// Maps directly to `~/.llmpu/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint, if it needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Host of the AI server, including port if applicable
    #[serde(default = "default_host")]
    pub host: String,

    /// Completions path appended to `host`
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Which session implementation to connect with
    #[serde(default = "default_session_type")]
    pub session_type: String,

    /// Prompt format applied to every request
    #[serde(default)]
    pub prompt_format: PromptFormat,

    /// Default max tokens per response
    #[serde(default = "default_token_limit")]
    pub token_limit: u32,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of context registers in the processing unit
    #[serde(default = "default_context_registers")]
    pub context_registers: usize,

    /// Extra fields merged into every request body (temperature, model, ...)
    #[serde(default)]
    pub extra_props: serde_json::Map<String, serde_json::Value>,

    /// Chat client settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Character names for persona-aware prompt formats
    #[serde(default)]
    pub personas: Personas,
}

fn default_host() -> String {
    "http://localhost:5001".into()
}
fn default_endpoint_path() -> String {
    "/v1/chat/completions".into()
}
fn default_session_type() -> String {
    "openai_compatible".into()
}
fn default_token_limit() -> u32 {
    1024
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_context_registers() -> usize {
    3
}

/// Redact a secret string for Debug output.
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
            .field("host", &self.host)
            .field("endpoint_path", &self.endpoint_path)
            .field("session_type", &self.session_type)
            .field("prompt_format", &self.prompt_format)
            .field("token_limit", &self.token_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("context_registers", &self.context_registers)
            .field("extra_props", &self.extra_props)
            .field("chat", &self.chat)
            .field("personas", &self.personas)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Memory location the chat transcript is kept in
    #[serde(default = "default_transcript_slot")]
    pub transcript_slot: String,

    /// Memory file loaded at start and saved on exit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_file: Option<PathBuf>,

    /// System prompt loaded before the first turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_transcript_slot() -> String {
    "ChatTranscript0".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            transcript_slot: default_transcript_slot(),
            memory_file: None,
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location with env var overrides.
    ///
    /// Search order:
    /// 1. `~/.llmpu/config.toml`
    /// 2. Environment variables (override file values)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
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

    /// Apply `LLMPU_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = std::env::var("LLMPU_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(host) = std::env::var("LLMPU_HOST") {
            self.host = host;
        }

        if let Ok(format) = std::env::var("LLMPU_PROMPT_FORMAT") {
            self.prompt_format = format
                .parse()
                .map_err(|e: llmpu_formatters::UnknownPromptFormat| {
                    ConfigError::ValidationError(e.to_string())
                })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".llmpu")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("host must not be empty".into()));
        }

        if !SESSION_TYPES.contains(&self.session_type.trim()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown session_type '{}' (expected one of: {})",
                self.session_type,
                SESSION_TYPES.join(", ")
            )));
        }

        if self.token_limit == 0 {
            return Err(ConfigError::ValidationError(
                "token_limit must be greater than 0".into(),
            ));
        }

        if self.context_registers == 0 {
            return Err(ConfigError::ValidationError(
                "context_registers must be at least 1".into(),
            ));
        }

        if self.chat.transcript_slot.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "chat.transcript_slot must name a memory location".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: default_host(),
            endpoint_path: default_endpoint_path(),
            session_type: default_session_type(),
            prompt_format: PromptFormat::default(),
            token_limit: default_token_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            context_registers: default_context_registers(),
            extra_props: serde_json::Map::new(),
            chat: ChatConfig::default(),
            personas: Personas::default(),
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
