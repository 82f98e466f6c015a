//! Answer generation capabilities
//!
//! The workflow only sees `Responder`. `LlmResponder` renders the prompt
//! templates and calls an `LlmClient`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::prompts::{AdaptContext, GenerateContext, PromptLoader, RegenerateContext};

const SYSTEM_GENERATE: &str = "You are an expert assistant that provides accurate and helpful answers.";
const SYSTEM_ADAPT: &str = "You are an expert assistant that adapts existing answers to new contexts.";
const SYSTEM_REGENERATE: &str = "You are an assistant that rigorously follows user feedback. \
                                 Adapt your answer exactly as requested, without adding unrequested content.";

/// A generation, adaptation or regeneration call failed
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model returned an empty answer")]
    EmptyResponse,

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    /// Raised by non-LLM responders (scripted test doubles, future backends)
    #[error("{0}")]
    Other(String),
}

/// Produces answer text
#[async_trait]
pub trait Responder: Send + Sync {
    /// Fresh answer for a question
    async fn generate(&self, question: &str) -> Result<String, GenerationError>;

    /// Rewrite a validated answer to a similar question so it fits `question`
    async fn adapt(&self, question: &str, source_question: &str, source_response: &str)
    -> Result<String, GenerationError>;

    /// New answer taking the human's feedback and the rejected answers into account
    async fn regenerate(
        &self,
        question: &str,
        feedback_notes: &str,
        previous_responses: &[String],
    ) -> Result<String, GenerationError>;
}

/// Responder backed by a chat model
pub struct LlmResponder {
    client: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl LlmResponder {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptLoader, max_tokens: u32) -> Self {
        debug!(%max_tokens, "LlmResponder::new: called");
        Self {
            client,
            prompts,
            max_tokens,
        }
    }

    async fn ask(&self, system_prompt: &str, user_prompt: String) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            system_prompt: system_prompt.to_string(),
            messages: vec![Message::user(user_prompt)],
            max_tokens: self.max_tokens,
        };
        let response = self.client.complete(request).await?;
        match response.content {
            Some(text) if !text.trim().is_empty() => {
                debug!(len = text.len(), stop_reason = ?response.stop_reason, "ask: got answer");
                Ok(text.trim().to_string())
            }
            _ => Err(GenerationError::EmptyResponse),
        }
    }

    fn render<C: serde::Serialize>(&self, name: &str, context: &C) -> Result<String, GenerationError> {
        self.prompts
            .render(name, context)
            .map_err(|e| GenerationError::Prompt(e.to_string()))
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn generate(&self, question: &str) -> Result<String, GenerationError> {
        debug!(%question, "generate: called");
        let prompt = self.render("generate", &GenerateContext { question })?;
        let answer = self.ask(SYSTEM_GENERATE, prompt).await?;
        info!("Generated a fresh answer");
        Ok(answer)
    }

    async fn adapt(
        &self,
        question: &str,
        source_question: &str,
        source_response: &str,
    ) -> Result<String, GenerationError> {
        debug!(%question, %source_question, "adapt: called");
        let prompt = self.render(
            "adapt",
            &AdaptContext {
                question,
                source_question,
                source_response,
            },
        )?;
        let answer = self.ask(SYSTEM_ADAPT, prompt).await?;
        info!(%source_question, "Adapted a cached answer");
        Ok(answer)
    }

    async fn regenerate(
        &self,
        question: &str,
        feedback_notes: &str,
        previous_responses: &[String],
    ) -> Result<String, GenerationError> {
        debug!(%question, previous = previous_responses.len(), "regenerate: called");
        let prompt = self.render(
            "regenerate",
            &RegenerateContext {
                question,
                feedback: feedback_notes,
                previous_responses,
            },
        )?;
        let answer = self.ask(SYSTEM_REGENERATE, prompt).await?;
        info!("Regenerated answer from feedback");
        Ok(answer)
    }
}

/// Stand-in for read-only commands that never produce answers
pub struct UnconfiguredResponder;

#[async_trait]
impl Responder for UnconfiguredResponder {
    async fn generate(&self, _question: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Other("language model is not configured".to_string()))
    }

    async fn adapt(&self, _: &str, _: &str, _: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Other("language model is not configured".to_string()))
    }

    async fn regenerate(&self, _: &str, _: &str, _: &[String]) -> Result<String, GenerationError> {
        Err(GenerationError::Other("language model is not configured".to_string()))
    }
}
