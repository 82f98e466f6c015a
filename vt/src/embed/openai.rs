//! OpenAI embeddings client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{EmbedError, Embedder};
use crate::config::EmbeddingConfig;
use crate::llm::LlmError;
use crate::llm::openai::post_json;

/// Calls `/v1/embeddings` with the configured model
pub struct OpenAIEmbedder {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl OpenAIEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        debug!(model = %config.model, "OpenAIEmbedder::from_config: called");
        let api_key = config.api_key()?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::Request(LlmError::Network(e)))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn build_request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        debug!(%self.model, len = text.len(), "OpenAIEmbedder::embed: called");
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = self.build_request_body(text);

        let response = post_json(&self.http, &url, &self.api_key, &body, self.timeout).await?;
        let parsed: EmbeddingResponse = response.json().await.map_err(LlmError::Network)?;
        parse_embedding(parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn parse_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, EmbedError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbedError::InvalidResponse("no embedding in response".to_string()))?;
    if embedding.is_empty() {
        return Err(EmbedError::InvalidResponse("empty embedding".to_string()));
    }
    Ok(embedding)
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_body() {
        let embedder = OpenAIEmbedder {
            model: "text-embedding-3-small".to_string(),
            api_key: "k".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            timeout: Duration::from_secs(30),
        };
        let body = embedder.build_request_body("What is X?");
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"], "What is X?");
    }

    #[test]
    fn test_parse_embedding() {
        let response: EmbeddingResponse =
            serde_json::from_value(serde_json::json!({"data": [{"embedding": [0.1, 0.2]}]})).unwrap();
        assert_eq!(parse_embedding(response).unwrap(), vec![0.1, 0.2]);

        let empty: EmbeddingResponse = serde_json::from_value(serde_json::json!({"data": []})).unwrap();
        assert!(matches!(parse_embedding(empty), Err(EmbedError::InvalidResponse(_))));
    }
}
