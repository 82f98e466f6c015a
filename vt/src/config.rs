//! Vetted configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Missing or invalid configuration, detected once at startup
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{component} API key not found. Set the {var} environment variable.")]
    MissingApiKey { component: &'static str, var: String },

    #[error("Unknown {component} provider: '{name}'. Supported: {supported}")]
    UnknownProvider {
        component: &'static str,
        name: String,
        supported: &'static str,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat model used to generate, adapt and regenerate answers
    pub llm: LlmConfig,

    /// Embedding backend for the semantic cache
    pub embedding: EmbeddingConfig,

    /// Semantic cache behavior
    pub cache: CacheConfig,

    /// Attempt budget and feedback defaults
    pub workflow: WorkflowConfig,

    /// Checkpoint storage
    pub storage: StorageConfig,

    /// Log level (overridden by --log-level)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks provider names, numeric ranges and that required API key
    /// environment variables are set. Call this early in startup to fail fast.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        tracing::debug!("validate: called");
        if self.llm.provider != "openai" {
            return Err(ConfigurationError::UnknownProvider {
                component: "LLM",
                name: self.llm.provider.clone(),
                supported: "openai",
            });
        }
        self.llm.api_key()?;

        match self.embedding.provider.as_str() {
            "openai" => {
                if self.cache.enabled {
                    self.embedding.api_key()?;
                }
            }
            "hashing" => {
                if self.embedding.dimensions == 0 {
                    return Err(ConfigurationError::InvalidValue {
                        field: "embedding.dimensions",
                        reason: "must be greater than 0".to_string(),
                    });
                }
            }
            other => {
                return Err(ConfigurationError::UnknownProvider {
                    component: "embedding",
                    name: other.to_string(),
                    supported: "openai, hashing",
                });
            }
        }

        if self.workflow.max_attempts == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "workflow.max-attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(-1.0..=1.0).contains(&self.cache.similarity_threshold) {
            return Err(ConfigurationError::InvalidValue {
                field: "cache.similarity-threshold",
                reason: format!("{} is outside [-1, 1]", self.cache.similarity_threshold),
            });
        }
        if self.cache.max_similar_results == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "cache.max-similar-results",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .vetted.yml
        let local_config = PathBuf::from(".vetted.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/vetted/vetted.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("vetted").join("vetted.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn read_api_key(component: &'static str, var: &str) -> std::result::Result<String, ConfigurationError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigurationError::MissingApiKey {
            component,
            var: var.to_string(),
        }),
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> std::result::Result<String, ConfigurationError> {
        read_api_key("LLM", &self.api_key_env)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 2048,
            timeout_ms: 120_000,
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "openai" or "hashing" (offline, deterministic)
    pub provider: String,

    /// Embedding model (openai only)
    pub model: String,

    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Vector size for the hashing embedder
    pub dimensions: usize,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl EmbeddingConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> std::result::Result<String, ConfigurationError> {
        read_api_key("Embedding", &self.api_key_env)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            dimensions: 256,
            timeout_ms: 30_000,
        }
    }
}

/// Semantic cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always generate fresh answers
    pub enabled: bool,

    /// Minimum cosine similarity for a cached answer to be reused
    #[serde(rename = "similarity-threshold")]
    pub similarity_threshold: f32,

    /// Number of candidates requested from the vector store
    #[serde(rename = "max-similar-results")]
    pub max_similar_results: usize,

    /// Directory for the local vector store
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.80,
            max_similar_results: 2,
            store_dir: data_dir().join("vectors"),
        }
    }
}

/// Workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Answers shown before a session is exhausted
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Feedback used when a rejection carries no notes
    #[serde(rename = "placeholder-feedback")]
    pub placeholder_feedback: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            placeholder_feedback: crate::retry::DEFAULT_PLACEHOLDER_FEEDBACK.to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Checkpoint store directory
    #[serde(rename = "checkpoint-dir")]
    pub checkpoint_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: data_dir().join("checkpoints"),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TEST_KEY_VAR: &str = "VETTED_TEST_API_KEY";

    fn config_with_key() -> Config {
        let mut config = Config::default();
        config.llm.api_key_env = TEST_KEY_VAR.to_string();
        config.embedding.api_key_env = TEST_KEY_VAR.to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.workflow.max_attempts, 3);
        assert_eq!(config.cache.max_similar_results, 2);
        assert!((config.cache.similarity_threshold - 0.80).abs() < f32::EPSILON);
        assert!(config.cache.store_dir.ends_with("vetted/vectors"));
        assert!(config.storage.checkpoint_dir.ends_with("vetted/checkpoints"));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  model: gpt-4o
  api-key-env: MY_API_KEY
  max-tokens: 1024

embedding:
  provider: hashing
  dimensions: 64

cache:
  similarity-threshold: 0.9
  max-similar-results: 5
  store-dir: /tmp/vectors

workflow:
  max-attempts: 5
  placeholder-feedback: "Try again."

storage:
  checkpoint-dir: /tmp/checkpoints

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.cache.max_similar_results, 5);
        assert_eq!(config.cache.store_dir, PathBuf::from("/tmp/vectors"));
        assert_eq!(config.workflow.max_attempts, 5);
        assert_eq!(config.workflow.placeholder_feedback, "Try again.");
        assert_eq!(config.storage.checkpoint_dir, PathBuf::from("/tmp/checkpoints"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gpt-4o-mini
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert!(config.cache.enabled);
        assert_eq!(config.workflow.placeholder_feedback, "Answer doesn't meet expectations.");
    }

    #[test]
    #[serial]
    fn test_validate_missing_api_key() {
        unsafe { std::env::remove_var(TEST_KEY_VAR) };
        let err = config_with_key().validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingApiKey { component: "LLM", .. }));
    }

    #[test]
    #[serial]
    fn test_validate_ok_with_key() {
        unsafe { std::env::set_var(TEST_KEY_VAR, "sk-test") };
        assert!(config_with_key().validate().is_ok());
        unsafe { std::env::remove_var(TEST_KEY_VAR) };
    }

    #[test]
    #[serial]
    fn test_validate_ranges_and_providers() {
        unsafe { std::env::set_var(TEST_KEY_VAR, "sk-test") };

        let mut config = config_with_key();
        config.workflow.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue {
                field: "workflow.max-attempts",
                ..
            })
        ));

        let mut config = config_with_key();
        config.cache.similarity_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigurationError::InvalidValue { .. })));

        let mut config = config_with_key();
        config.cache.max_similar_results = 0;
        assert!(matches!(config.validate(), Err(ConfigurationError::InvalidValue { .. })));

        let mut config = config_with_key();
        config.embedding.provider = "cohere".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::UnknownProvider {
                component: "embedding",
                ..
            })
        ));

        let mut config = config_with_key();
        config.llm.provider = "anthropic".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::UnknownProvider { component: "LLM", .. })
        ));

        unsafe { std::env::remove_var(TEST_KEY_VAR) };
    }

    #[test]
    #[serial]
    fn test_hashing_embedder_needs_no_embedding_key() {
        unsafe { std::env::set_var(TEST_KEY_VAR, "sk-test") };
        let mut config = config_with_key();
        config.embedding.provider = "hashing".to_string();
        config.embedding.api_key_env = "VETTED_TEST_UNSET_VAR".to_string();
        assert!(config.validate().is_ok());
        unsafe { std::env::remove_var(TEST_KEY_VAR) };
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("vetted.yml");
        fs::write(&path, "workflow:\n  max-attempts: 4\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.workflow.max_attempts, 4);
    }
}
