//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Vetted - human-validated semantic answer cache
#[derive(Parser)]
#[command(
    name = "vt",
    about = "Answer questions from a cache of human-approved answers, with a resumable review loop",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to the interactive loop)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question; prints the answer and the thread id to review it with
    Ask {
        /// The question
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Approve the current answer of a thread
    Approve {
        /// Thread ID (or unique prefix)
        thread_id: String,

        /// Notes stored alongside the validated answer
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Reject the current answer of a thread
    Reject {
        /// Thread ID (or unique prefix)
        thread_id: String,

        /// What to improve
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Continue a thread from its last checkpoint
    Resume {
        /// Thread ID (or unique prefix)
        thread_id: String,
    },

    /// Show a thread's current state
    Show {
        /// Thread ID (or unique prefix)
        thread_id: String,
    },

    /// List every checkpoint of a thread
    History {
        /// Thread ID (or unique prefix)
        thread_id: String,
    },

    /// List known threads
    Threads,

    /// Print (or write) the workflow state machine as a Mermaid diagram
    Graph {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive question/review loop
    Repl,
}

impl Command {
    /// Whether the command calls the language model
    pub fn needs_llm(&self) -> bool {
        let needs = matches!(
            self,
            Command::Ask { .. }
                | Command::Approve { .. }
                | Command::Reject { .. }
                | Command::Resume { .. }
                | Command::Repl
        );
        debug!(?self, needs, "needs_llm: called");
        needs
    }
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetted")
        .join("logs")
        .join("vetted.log")
}

/// after_help text pointing at the log file
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
