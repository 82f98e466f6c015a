//! CLI argument parsing for checkpointstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ck")]
#[command(author, version, about = "Inspect and administer workflow checkpoints", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Checkpoint store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List threads with their latest step
    Threads,

    /// Show a thread's latest checkpoint (or a specific step)
    Show {
        /// Thread ID
        #[arg(required = true)]
        thread_id: String,

        /// Step to show instead of the latest
        #[arg(long)]
        step: Option<u64>,
    },

    /// List every checkpoint of a thread
    History {
        /// Thread ID
        #[arg(required = true)]
        thread_id: String,
    },

    /// Delete all checkpoints of a thread
    Delete {
        /// Thread ID
        #[arg(required = true)]
        thread_id: String,
    },
}
