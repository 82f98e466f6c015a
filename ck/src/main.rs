use chrono::{Local, TimeZone};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde_json::Value;

use checkpointstore::cli::{Cli, Command};
use checkpointstore::config::Config;
use checkpointstore::{Checkpoint, CheckpointStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn format_time(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn status_of(snapshot: &Value) -> String {
    snapshot
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("-")
        .to_string()
}

fn print_summary(cp: &Checkpoint<Value>) {
    println!(
        "{} {:>4}  {:<12} {:<18} {}",
        cp.thread_id.cyan(),
        cp.step.to_string().yellow(),
        cp.pending_node,
        status_of(&cp.snapshot),
        format_time(cp.created_at).dimmed()
    );
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("checkpointstore starting");

    let mut store = CheckpointStore::open(&store_path)
        .context(format!("Failed to open checkpoint store at {}", store_path.display()))?;

    match cli.command {
        Command::Threads => {
            let threads: Vec<Checkpoint<Value>> = store.latest_per_thread()?;
            if threads.is_empty() {
                println!("No threads found");
            } else {
                for cp in &threads {
                    print_summary(cp);
                }
            }
        }
        Command::Show { thread_id, step } => {
            let cp: Checkpoint<Value> = match step {
                Some(step) => store.load_step(&thread_id, step)?,
                None => store.load_latest(&thread_id)?,
            };
            println!("Thread: {}", cp.thread_id.cyan());
            println!("  Step: {}", cp.step);
            println!("  Pending node: {}", cp.pending_node);
            println!("  Created: {}", format_time(cp.created_at));
            println!("{}", serde_json::to_string_pretty(&cp.snapshot)?);
        }
        Command::History { thread_id } => {
            let history: Vec<Checkpoint<Value>> = store.history(&thread_id)?;
            for cp in &history {
                print_summary(cp);
            }
        }
        Command::Delete { thread_id } => {
            let removed = store.delete_thread(&thread_id)?;
            println!(
                "{} Deleted thread {} ({} checkpoints)",
                "✓".green(),
                thread_id.cyan(),
                removed
            );
        }
    }

    Ok(())
}
