//! Configuration loading, validation, and management for docchat.
//!
//! Loads configuration from `~/.docchat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.docchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Which provider entry to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Which backend model to target
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Alternate service endpoint (overrides the provider's base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Whether to stream tokens to the caller as they are generated
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Maximum tokens per answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt configuration
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_true() -> bool {
    true
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
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_path", &self.base_path)
            .field("streaming", &self.streaming)
            .field("max_tokens", &self.max_tokens)
            .field("retrieval", &self.retrieval)
            .field("prompt", &self.prompt)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per question
    #[serde(default = "default_k")]
    pub k: usize,

    /// Path of the pre-built index file
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Model used to embed queries; must match the one used at ingestion
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_k() -> usize {
    4
}
fn default_index_path() -> PathBuf {
    AppConfig::config_dir().join("index.json")
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            index_path: default_index_path(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Replace the built-in persona description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// Replace the built-in greeting message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,

    /// Stop sequences applied to every answer
    #[serde(default)]
    pub stop: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

}

impl AppConfig {
    /// Load configuration from the default path (~/.docchat/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, then apply environment overrides:
    /// - `DOCCHAT_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `DOCCHAT_MODEL`
    /// - `DOCCHAT_BASE_PATH`
    /// - `DOCCHAT_INDEX`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("DOCCHAT_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }

        if let Some(model) = var("DOCCHAT_MODEL") {
            self.model = model;
        }

        if let Some(base_path) = var("DOCCHAT_BASE_PATH") {
            self.base_path = Some(base_path);
        }

        if let Some(index) = var("DOCCHAT_INDEX") {
            self.retrieval.index_path = PathBuf::from(index);
        }
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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docchat")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.k must be at least 1".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        Ok(())
    }

    /// Check if an API key is available for the selected provider, either
    /// top-level (config or environment) or under `[providers.<name>]`.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            base_path: None,
            streaming: true,
            max_tokens: None,
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            providers: HashMap::new(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.retrieval.k, 4);
        assert_eq!(config.temperature, 0.0);
        assert!(config.streaming);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.retrieval.index_path, config.retrieval.index_path);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_k_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "gpt-4o"
temperature = 0.2
base_path = "http://localhost:8000/v1"
streaming = false

[retrieval]
k = 6
index_path = "/data/esg/index.json"

[prompt]
stop = ["\nHuman:"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_path.as_deref(), Some("http://localhost:8000/v1"));
        assert!(!config.streaming);
        assert_eq!(config.retrieval.k, 6);
        assert_eq!(config.retrieval.embedding_model, "text-embedding-3-small");
        assert_eq!(config.prompt.stop, vec!["\nHuman:".to_string()]);
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn unparseable_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                api_url: None,
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-other"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn provider_section_key_counts_as_configured() {
        let mut config = AppConfig::default();
        assert!(!config.has_api_key());

        config.providers.insert(
            "openrouter".into(),
            ProviderConfig {
                api_key: Some("sk-elsewhere".into()),
                api_url: None,
            },
        );
        assert!(!config.has_api_key());

        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-prov".into()),
                api_url: None,
            },
        );
        assert!(config.has_api_key());
    }

    #[test]
    fn env_key_order_and_precedence() {
        let env: HashMap<&str, &str> = [
            ("DOCCHAT_API_KEY", "sk-docchat"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("DOCCHAT_MODEL", "gpt-4o"),
            ("DOCCHAT_INDEX", "/data/esg.json"),
        ]
        .into_iter()
        .collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let mut config = AppConfig::default();
        config.apply_env(lookup);
        assert_eq!(config.api_key.as_deref(), Some("sk-docchat"));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.retrieval.index_path, PathBuf::from("/data/esg.json"));
        assert!(config.base_path.is_none());

        let mut config = AppConfig::default();
        config.apply_env(|name: &str| {
            (name == "OPENAI_API_KEY").then(|| "sk-openai".to_string())
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));

        let mut config = AppConfig {
            api_key: Some("sk-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(lookup);
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("[retrieval]"));
    }
}
