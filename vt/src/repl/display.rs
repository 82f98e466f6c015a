//! Terminal rendering shared by the REPL and the one-shot commands

use chrono::{Local, TimeZone};
use checkpointstore::Checkpoint;
use colored::Colorize;

use crate::domain::{Provenance, Session, SessionStatus};
use crate::workflow::{Outcome, ThreadSummary};

fn format_ms(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn status_colored(status: SessionStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        SessionStatus::Validated => text.green(),
        SessionStatus::Exhausted => text.yellow(),
        SessionStatus::Aborted => text.red(),
        SessionStatus::AwaitingFeedback => text.cyan(),
        _ => text.normal(),
    }
}

fn provenance_line(session: &Session) -> String {
    match (&session.provenance, &session.cache_match) {
        (Provenance::Generated, _) | (_, None) => session.provenance.to_string(),
        (p, Some(m)) => format!("{} from {:?} (score {:.3})", p, m.source_question, m.score),
    }
}

/// Full view of a session
pub fn print_session(session: &Session) {
    println!("{} {}", "Thread:".bold(), session.thread_id);
    println!("{} {}", "Question:".bold(), session.question);
    println!("{} {}", "Status:".bold(), status_colored(session.status));
    println!("{} {}", "Attempts:".bold(), session.attempt_count);
    println!("{} {}", "Source:".bold(), provenance_line(session));
    if !session.feedback_notes.is_empty() {
        println!("{} {}", "Feedback:".bold(), session.feedback_notes);
    }
    if let Some(reason) = &session.abort_reason {
        println!("{} {}", "Aborted:".red().bold(), reason);
    }
    for warning in &session.warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }
    println!("{} {}", "Updated:".bold(), format_ms(session.updated_at));
    if !session.current_response.is_empty() {
        println!();
        println!("{}", session.current_response);
    }
}

/// Answer plus what to do next
pub fn print_outcome(outcome: &Outcome) {
    let session = outcome.session();
    match outcome {
        Outcome::AwaitingFeedback(_) => {
            println!(
                "{} {}",
                format!("Answer (attempt {}, {}):", session.attempt_count, provenance_line(session)).cyan(),
                session.thread_id.dimmed()
            );
            println!();
            println!("{}", session.current_response);
        }
        Outcome::Validated(_) => {
            println!("{}", "Answer validated.".green());
        }
        Outcome::Exhausted(_) => {
            println!(
                "{}",
                format!("No acceptable answer after {} attempts.", session.attempt_count).yellow()
            );
        }
        Outcome::Aborted { reason, .. } => {
            println!("{} {}", "Aborted:".red().bold(), reason);
            println!("Question kept for retry: {}", session.question);
        }
    }
    for warning in &session.warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }
}

pub fn print_thread_summary(summary: &ThreadSummary) {
    let question: String = summary.question.chars().take(60).collect();
    println!(
        "{}  {:<18} {:>2}  {:<10} {}  {}",
        summary.thread_id,
        status_colored(summary.status),
        summary.attempt_count,
        summary.pending_node,
        format_ms(summary.updated_at).dimmed(),
        question
    );
}

pub fn print_checkpoint_line(checkpoint: &Checkpoint<Session>) {
    let verdict = checkpoint
        .snapshot
        .verdict
        .map(|v| format!(" verdict={:?}", v).to_lowercase())
        .unwrap_or_default();
    println!(
        "{:>4}  {}  {:<18} next={:<10} attempts={}{}",
        checkpoint.step,
        format_ms(checkpoint.created_at).dimmed(),
        status_colored(checkpoint.snapshot.status),
        checkpoint.pending_node,
        checkpoint.snapshot.attempt_count,
        verdict
    );
}
