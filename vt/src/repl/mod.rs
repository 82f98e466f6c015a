//! Interactive question/review loop
//!
//! Asks for a question, shows the answer, collects a yes/no verdict and
//! improvement notes, and repeats until the session ends.

mod display;
mod session;

pub use display::{print_checkpoint_line, print_outcome, print_session, print_thread_summary};
pub use session::ReplSession;

use eyre::Result;

use crate::workflow::WorkflowEngine;

/// Run the interactive loop
///
/// This is the entry point for `vt` and `vt repl`.
pub async fn run_interactive(engine: &WorkflowEngine) -> Result<()> {
    let mut session = ReplSession::new(engine)?;
    session.run().await
}
