//! LLM client module
//!
//! Provides chat completion requests behind the `LlmClient` trait.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
pub(crate) mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::{ConfigurationError, LlmConfig};

/// Create an LLM client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(ConfigurationError::UnknownProvider {
                component: "LLM",
                name: other.to_string(),
                supported: "openai",
            }
            .into())
        }
    }
}
