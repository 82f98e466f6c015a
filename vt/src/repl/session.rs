//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use super::display::print_outcome;
use crate::domain::SessionPatch;
use crate::workflow::{Outcome, WorkflowEngine};

/// What the human typed at a prompt
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Quit,
}

/// Interactive question/review session
pub struct ReplSession<'a> {
    engine: &'a WorkflowEngine,
    rl: DefaultEditor,
}

impl<'a> ReplSession<'a> {
    pub fn new(engine: &'a WorkflowEngine) -> Result<Self> {
        let rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self { engine, rl })
    }

    /// Run the main loop until `exit`, `quit` or Ctrl+D
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let question = match self.read(&format!("{} ", "Question>".bright_green()))? {
                Input::Quit => break,
                Input::Line(line) if line.is_empty() => continue,
                Input::Line(line) => line,
            };

            match self.engine.start(&question).await {
                Ok(outcome) => {
                    if !self.review(outcome).await? {
                        break;
                    }
                }
                Err(e) => println!("{} {}", "Error:".red(), e),
            }
            println!();
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Loop one session through review; `false` when the human quit
    async fn review(&mut self, mut outcome: Outcome) -> Result<bool> {
        loop {
            println!();
            print_outcome(&outcome);
            if outcome.is_terminal() {
                return Ok(true);
            }
            let thread_id = outcome.session().thread_id.clone();

            let approved = loop {
                match self.read(&format!("{} ", "Is this answer valid? (yes/no)".bright_yellow()))? {
                    Input::Quit => {
                        println!("Session {} left awaiting feedback.", thread_id.dimmed());
                        return Ok(false);
                    }
                    Input::Line(line) => match parse_yes_no(&line) {
                        Some(answer) => break answer,
                        None => println!("Please answer yes or no."),
                    },
                }
            };

            let patch = if approved {
                SessionPatch::approve(None)
            } else {
                let notes = match self.read(&format!("{} ", "What should be improved?".bright_yellow()))? {
                    Input::Quit => {
                        println!("Session {} left awaiting feedback.", thread_id.dimmed());
                        return Ok(false);
                    }
                    Input::Line(line) => line,
                };
                SessionPatch::reject((!notes.is_empty()).then_some(notes))
            };

            debug!(%thread_id, approved, "review: resuming");
            outcome = match self.engine.resume(&thread_id, Some(patch)).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(%thread_id, error = %e, "review: resume failed");
                    println!("{} {}", "Error:".red(), e);
                    return Ok(true);
                }
            };
        }
    }

    fn read(&mut self, prompt: &str) -> Result<Input> {
        match self.rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if matches!(line.to_lowercase().as_str(), "exit" | "quit") {
                    return Ok(Input::Quit);
                }
                if !line.is_empty() {
                    let _ = self.rl.add_history_entry(&line);
                }
                Ok(Input::Line(line))
            }
            // Ctrl+C - just show new prompt
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                Ok(Input::Line(String::new()))
            }
            Err(ReadlineError::Eof) => {
                println!();
                Ok(Input::Quit)
            }
            Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Vetted".bright_cyan().bold());
        println!("Ask a question; review each answer with yes/no.");
        println!("Type {} or {} to leave", "exit".yellow(), "quit".yellow());
        println!();
    }
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
