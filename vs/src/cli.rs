//! CLI argument parsing for vectorstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vs")]
#[command(author, version, about = "Administer the semantic cache vector store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Vector store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored records, newest first
    List {
        /// Maximum records to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the number of stored records
    Count,

    /// Display one record in full
    Show {
        /// Record ID
        #[arg(required = true)]
        id: String,
    },

    /// Delete a record
    Delete {
        /// Record ID
        #[arg(required = true)]
        id: String,
    },

    /// Delete every record
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}
