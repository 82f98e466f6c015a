//! Vetted - human-validated semantic answer cache
//!
//! Questions are answered from a cache of answers a human has already
//! approved, adapted when the cached question is only similar, or generated
//! fresh. Every answer then goes through a review loop: the workflow suspends
//! at a checkpoint until a verdict arrives, regenerates from feedback on
//! rejection, and gives up after a fixed number of attempts.
//!
//! # Modules
//!
//! - [`workflow`] - Resumable state machine (start, resume, inspect)
//! - [`domain`] - Session, feedback patch and node ids
//! - [`state`] - Actor owning the checkpoint store
//! - [`cache`] - Semantic cache policy over a vector store
//! - [`retry`] - Attempt budget
//! - [`responder`] - Answer generation capability
//! - [`llm`] / [`embed`] - OpenAI-compatible clients
//! - [`config`] - Configuration types and loading

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod embed;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod responder;
pub mod retry;
pub mod state;
pub mod workflow;

// Re-export commonly used types
pub use cache::{CacheDecision, CacheEntry, NullVectorStore, SemanticCache, VectorStore};
pub use config::{Config, ConfigurationError};
pub use domain::{Node, Provenance, Session, SessionPatch, SessionStatus, Verdict};
pub use responder::{GenerationError, Responder};
pub use retry::{DEFAULT_PLACEHOLDER_FEEDBACK, RetryController};
pub use state::{CheckpointManager, StateError};
pub use workflow::{Outcome, ThreadSummary, WorkflowEngine, WorkflowError};
