use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use vectorstore::EmbeddingStore;
use vectorstore::cli::{Cli, Command};
use vectorstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("vectorstore starting");

    let store = EmbeddingStore::open(&store_path)
        .context(format!("Failed to open vector store at {}", store_path.display()))?;

    match cli.command {
        Command::List { limit } => {
            let records = store.list(Some(limit.unwrap_or(config.list_limit)))?;
            if records.is_empty() {
                println!("No records found");
            } else {
                for r in records {
                    println!("{} {}", r.id.yellow(), first_line(&r.index_text));
                }
            }
        }
        Command::Count => {
            println!("{}", store.count()?);
        }
        Command::Show { id } => {
            let record = store
                .get(&id)?
                .ok_or_else(|| eyre::eyre!("Record not found: {}", id))?;
            println!("Record: {}", record.id.cyan());
            println!("  Dimensions: {}", record.dimensions);
            println!("  Index text: {}", record.index_text);
            println!("  Metadata: {}", serde_json::to_string(&record.metadata)?);
            println!("{}", record.content);
        }
        Command::Delete { id } => {
            if !store.delete(&id)? {
                return Err(eyre::eyre!("Record not found: {}", id));
            }
            println!("{} Deleted record: {}", "✓".green(), id);
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(eyre::eyre!("Refusing to clear the store without --yes"));
            }
            let removed = store.clear()?;
            println!("{} Cleared {} records", "✓".green(), removed);
        }
    }

    Ok(())
}
