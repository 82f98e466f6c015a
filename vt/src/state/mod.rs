//! Checkpoint persistence with actor pattern
//!
//! CheckpointManager owns the CheckpointStore and processes messages via
//! channels, so the workflow never touches SQLite directly.

mod manager;
mod messages;

pub use manager::CheckpointManager;
pub use messages::{CheckpointCommand, StateError, StateResponse};
