//! Checkpoint manager messages
//!
//! Commands and responses for the actor pattern.

use checkpointstore::{Checkpoint, CheckpointError, ThreadLock};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Session, SessionPatch};

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread is busy: {0}")]
    Busy(String),

    #[error("Patch rejected: {0}")]
    PatchRejected(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<CheckpointError> for StateError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::NotFound(id) => StateError::NotFound(id),
            CheckpointError::Busy(id) => StateError::Busy(id),
            CheckpointError::PatchRejected(reason) => StateError::PatchRejected(reason),
            other => StateError::StoreError(other.to_string()),
        }
    }
}

/// Response from checkpoint operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the CheckpointManager actor
#[derive(Debug)]
pub enum CheckpointCommand {
    Save {
        session: Box<Session>,
        pending_node: String,
        reply: oneshot::Sender<StateResponse<u64>>,
    },
    LoadLatest {
        thread_id: String,
        reply: oneshot::Sender<StateResponse<Checkpoint<Session>>>,
    },
    ApplyPatch {
        thread_id: String,
        patch: SessionPatch,
        as_node: String,
        reply: oneshot::Sender<StateResponse<Checkpoint<Session>>>,
    },
    History {
        thread_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Checkpoint<Session>>>>,
    },
    ListLatest {
        reply: oneshot::Sender<StateResponse<Vec<Checkpoint<Session>>>>,
    },
    LockThread {
        thread_id: String,
        reply: oneshot::Sender<StateResponse<ThreadLock>>,
    },

    // Shutdown
    Shutdown,
}
