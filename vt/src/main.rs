//! Vetted - human-validated semantic answer cache
//!
//! CLI entry point: one-shot workflow commands and the interactive loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use vetted::cache::{LocalVectorStore, NullVectorStore, SemanticCache, VectorStore};
use vetted::cli::{Cli, Command, generate_after_help};
use vetted::config::Config;
use vetted::domain::SessionPatch;
use vetted::embed::create_embedder;
use vetted::llm::create_client;
use vetted::prompts::PromptLoader;
use vetted::repl::{self, print_checkpoint_line, print_outcome, print_session, print_thread_summary};
use vetted::responder::{LlmResponder, Responder, UnconfiguredResponder};
use vetted::retry::RetryController;
use vetted::state::CheckpointManager;
use vetted::workflow::{Outcome, WorkflowEngine, graph};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetted")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("vetted.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Semantic cache over the local vector store; an empty cache when disabled or unavailable
fn build_cache(config: &Config) -> SemanticCache {
    debug!(enabled = config.cache.enabled, "build_cache: called");
    let store: Arc<dyn VectorStore> = if !config.cache.enabled {
        info!("Semantic cache disabled");
        Arc::new(NullVectorStore)
    } else {
        let opened = create_embedder(&config.embedding)
            .map_err(|e| e.to_string())
            .and_then(|embedder| LocalVectorStore::open(&config.cache.store_dir, embedder).map_err(|e| e.to_string()));
        match opened {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "Vector store unavailable, continuing without cache");
                eprintln!("{} semantic cache unavailable: {}", "Warning:".yellow(), e);
                Arc::new(NullVectorStore)
            }
        }
    };
    SemanticCache::new(
        store,
        config.cache.similarity_threshold,
        config.cache.max_similar_results,
    )
}

fn build_engine(config: &Config, needs_llm: bool) -> Result<WorkflowEngine> {
    debug!(needs_llm, "build_engine: called");
    let checkpoints = CheckpointManager::spawn(&config.storage.checkpoint_dir).context(format!(
        "Failed to open checkpoint store at {}",
        config.storage.checkpoint_dir.display()
    ))?;

    let (responder, cache): (Arc<dyn Responder>, SemanticCache) = if needs_llm {
        config.validate().context("Invalid configuration")?;
        let client = create_client(&config.llm).context("Failed to create LLM client")?;
        let prompts = PromptLoader::new(std::env::current_dir().context("Failed to get current directory")?);
        (
            Arc::new(LlmResponder::new(client, prompts, config.llm.max_tokens)),
            build_cache(config),
        )
    } else {
        (
            Arc::new(UnconfiguredResponder),
            SemanticCache::new(Arc::new(NullVectorStore), config.cache.similarity_threshold, 1),
        )
    };

    let retry = RetryController::new(config.workflow.max_attempts, config.workflow.placeholder_feedback.clone());
    Ok(WorkflowEngine::new(checkpoints, responder, cache, retry))
}

fn print_next_steps(outcome: &Outcome) {
    if let Outcome::AwaitingFeedback(session) = outcome {
        println!();
        println!(
            "Review with: {} or {}",
            format!("vt approve {}", session.thread_id).yellow(),
            format!("vt reject {} --notes \"...\"", session.thread_id).yellow()
        );
    }
}

async fn cmd_ask(engine: &WorkflowEngine, question: &str) -> Result<()> {
    debug!(%question, "cmd_ask: called");
    let outcome = engine.start(question).await?;
    print_outcome(&outcome);
    print_next_steps(&outcome);
    Ok(())
}

async fn cmd_verdict(engine: &WorkflowEngine, thread: &str, patch: SessionPatch) -> Result<()> {
    debug!(%thread, ?patch, "cmd_verdict: called");
    let thread_id = engine.resolve_thread(thread).await?;
    let outcome = engine.resume(&thread_id, Some(patch)).await?;
    print_outcome(&outcome);
    print_next_steps(&outcome);
    Ok(())
}

async fn cmd_resume(engine: &WorkflowEngine, thread: &str) -> Result<()> {
    debug!(%thread, "cmd_resume: called");
    let thread_id = engine.resolve_thread(thread).await?;
    let outcome = engine.resume(&thread_id, None).await?;
    print_outcome(&outcome);
    print_next_steps(&outcome);
    Ok(())
}

async fn cmd_show(engine: &WorkflowEngine, thread: &str) -> Result<()> {
    debug!(%thread, "cmd_show: called");
    let thread_id = engine.resolve_thread(thread).await?;
    print_session(&engine.session(&thread_id).await?);
    Ok(())
}

async fn cmd_history(engine: &WorkflowEngine, thread: &str) -> Result<()> {
    debug!(%thread, "cmd_history: called");
    let thread_id = engine.resolve_thread(thread).await?;
    let history = engine.history(&thread_id).await?;
    println!("{} ({} checkpoints)", thread_id.cyan(), history.len());
    for checkpoint in &history {
        print_checkpoint_line(checkpoint);
    }
    Ok(())
}

async fn cmd_threads(engine: &WorkflowEngine) -> Result<()> {
    debug!("cmd_threads: called");
    let threads = engine.sessions().await?;
    if threads.is_empty() {
        println!("No threads found");
        return Ok(());
    }
    for summary in &threads {
        print_thread_summary(summary);
    }
    Ok(())
}

/// Best effort: a failed write is reported, never fatal
fn cmd_graph(output: Option<&Path>) -> Result<()> {
    debug!(?output, "cmd_graph: called");
    match output {
        Some(path) => match graph::write_mermaid(path) {
            Ok(()) => println!("Graph written to {}", path.display()),
            Err(e) => {
                warn!(error = %e, "Graph visualization failed");
                eprintln!("{} {:#}", "Warning:".yellow(), e);
            }
        },
        None => print!("{}", graph::render_mermaid()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let command = cli.command.unwrap_or(Command::Repl);
    debug!(?command, "main: dispatching command");

    if let Command::Graph { output } = &command {
        return cmd_graph(output.as_deref());
    }

    let engine = build_engine(&config, command.needs_llm())?;
    match command {
        Command::Ask { question } => cmd_ask(&engine, &question.join(" ")).await,
        Command::Approve { thread_id, notes } => cmd_verdict(&engine, &thread_id, SessionPatch::approve(notes)).await,
        Command::Reject { thread_id, notes } => cmd_verdict(&engine, &thread_id, SessionPatch::reject(notes)).await,
        Command::Resume { thread_id } => cmd_resume(&engine, &thread_id).await,
        Command::Show { thread_id } => cmd_show(&engine, &thread_id).await,
        Command::History { thread_id } => cmd_history(&engine, &thread_id).await,
        Command::Threads => cmd_threads(&engine).await,
        Command::Repl => repl::run_interactive(&engine).await,
        Command::Graph { .. } => Ok(()),
    }
}
