//! Workflow error types

use thiserror::Error;

use crate::domain::TransitionError;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread prefix {prefix:?} matches {count} threads")]
    AmbiguousThread { prefix: String, count: usize },

    #[error("Thread {0} is already running")]
    ThreadBusy(String),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Checkpoint names unknown node {0:?}")]
    UnknownNode(String),

    #[error("Checkpoint error: {0}")]
    State(StateError),
}

impl From<StateError> for WorkflowError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(id) => WorkflowError::NotFound(id),
            StateError::Busy(id) => WorkflowError::ThreadBusy(id),
            StateError::PatchRejected(reason) => WorkflowError::InvalidPatch(reason),
            other => WorkflowError::State(other),
        }
    }
}
