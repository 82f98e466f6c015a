//! Text embedding
//!
//! The semantic cache turns questions into vectors through `Embedder`.
//! `OpenAIEmbedder` calls `/v1/embeddings`; `HashEmbedder` is a deterministic
//! offline fallback that needs no API key.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

mod hashing;
mod openai;

pub use hashing::HashEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{ConfigurationError, EmbeddingConfig};
use crate::llm::LlmError;

/// Embedding failures
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding request failed: {0}")]
    Request(#[from] LlmError),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Turns text into a dense vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Create an embedder based on the provider specified in config
///
/// An `openai` provider without an API key falls back to hashing so the cache
/// keeps working offline.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    debug!(provider = %config.provider, "create_embedder: called");
    match config.provider.as_str() {
        "openai" => match OpenAIEmbedder::from_config(config) {
            Ok(embedder) => Ok(Arc::new(embedder)),
            Err(EmbedError::Configuration(e)) => {
                warn!(error = %e, "No embedding API key, falling back to hashing embedder");
                Ok(Arc::new(HashEmbedder::new(config.dimensions)))
            }
            Err(e) => Err(e),
        },
        "hashing" => Ok(Arc::new(HashEmbedder::new(config.dimensions))),
        other => Err(ConfigurationError::UnknownProvider {
            component: "embedding",
            name: other.to_string(),
            supported: "openai, hashing",
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_embedder() {
        let config = EmbeddingConfig {
            provider: "hashing".to_string(),
            dimensions: 32,
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hashing");
    }

    #[test]
    fn test_openai_without_key_falls_back() {
        let config = EmbeddingConfig {
            api_key_env: "VETTED_TEST_NEVER_SET_EMBED_KEY".to_string(),
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hashing");
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(create_embedder(&config), Err(EmbedError::Configuration(_))));
    }
}
