//! Resumable feedback workflow

mod engine;
mod error;
pub mod graph;

pub use engine::{Outcome, ThreadSummary, WorkflowEngine};
pub use error::WorkflowError;
