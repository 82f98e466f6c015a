//! Mermaid rendering of the session state machine

use std::path::Path;

use eyre::{Context, Result};
use tracing::debug;

use crate::domain::SessionStatus;

fn state_name(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Init => "Init",
        SessionStatus::Generating => "Generating",
        SessionStatus::AwaitingFeedback => "AwaitingFeedback",
        SessionStatus::Evaluating => "Evaluating",
        SessionStatus::Regenerating => "Regenerating",
        SessionStatus::Saving => "Saving",
        SessionStatus::Validated => "Validated",
        SessionStatus::Exhausted => "Exhausted",
        SessionStatus::Aborted => "Aborted",
    }
}

fn event(from: SessionStatus, to: SessionStatus) -> &'static str {
    use SessionStatus::*;
    match (from, to) {
        (Init, Generating) => "start",
        (Generating, AwaitingFeedback) => "answer ready",
        (Generating, Aborted) | (Regenerating, Aborted) => "generation failed",
        (AwaitingFeedback, Evaluating) => "verdict received",
        (Evaluating, Saving) => "approve",
        (Evaluating, Regenerating) => "reject, budget left",
        (Evaluating, Exhausted) => "reject, budget spent",
        (Regenerating, AwaitingFeedback) => "regenerated",
        (Saving, Validated) => "stored",
        _ => "",
    }
}

/// `stateDiagram-v2` source for every allowed transition
pub fn render_mermaid() -> String {
    debug!("render_mermaid: called");
    let mut out = String::from("stateDiagram-v2\n");
    out.push_str("    [*] --> Init\n");
    for (from, to) in SessionStatus::transitions() {
        out.push_str(&format!("    {} --> {}: {}\n", state_name(from), state_name(to), event(from, to)));
    }
    for terminal in [SessionStatus::Validated, SessionStatus::Exhausted, SessionStatus::Aborted] {
        out.push_str(&format!("    {} --> [*]\n", state_name(terminal)));
    }
    out
}

/// Write the diagram to `path`
pub fn write_mermaid(path: &Path) -> Result<()> {
    debug!(?path, "write_mermaid: called");
    std::fs::write(path, render_mermaid()).context(format!("Failed to write graph to {}", path.display()))
}
