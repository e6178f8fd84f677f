//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Output is driven by the conversation's event bus: after every call the
//! pending events are drained and rendered.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use chatrelay_core::bus::ChatEvent;
use chatrelay_core::utils::mask_secret;
use chatrelay_core::{ChatError, Role};
use chatrelay_engine::Conversation;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// One line of REPL input, classified.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    /// `/key KEY [MODEL]`
    Key {
        key: &'a str,
        model: Option<&'a str>,
    },
    /// `/model`: show the model in use
    Model,
    /// `/history`: print the transcript
    History,
    /// Malformed or unknown slash command.
    Usage(&'static str),
    Message(&'a str),
}

/// Run the interactive REPL loop.
pub async fn run(conversation: &Conversation, session: &str) -> Result<()> {
    helpers::print_banner(session);

    let mut editor = create_editor()?;

    // Greeting, and a credential prompt if nothing is stored yet.
    if render_events(conversation).await {
        prompt_for_credential(&mut editor, conversation).await;
    }

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let command = parse_command(trimmed);
        // Keys stay out of the history file.
        if !matches!(command, ReplCommand::Key { .. }) {
            let _ = editor.add_history_entry(&input);
        }

        match command {
            ReplCommand::Exit => {
                println!("\nGoodbye!");
                break;
            }
            ReplCommand::Key { key, model } => {
                apply_credential(conversation, key, model).await;
            }
            ReplCommand::Model => {
                let credentials = conversation.credentials().await;
                match credentials.model {
                    Some(model) => println!("  model: {}", model.bold()),
                    None => println!("  {}", "no model selected yet".dimmed()),
                }
            }
            ReplCommand::History => {
                helpers::print_transcript(&conversation.transcript().await);
            }
            ReplCommand::Usage(usage) => {
                println!("  {}", usage.yellow());
            }
            ReplCommand::Message(text) => {
                debug!(session, chars = text.len(), "submitting turn");
                helpers::print_thinking();
                let result = conversation.submit_turn(text).await;
                helpers::clear_thinking();
                match result {
                    // Replies and error turns arrive as events.
                    Ok(_) | Err(ChatError::MissingCredential) => {}
                    Err(e) => eprintln!("\n{} {e}\n", "Error:".red()),
                }
            }
        }

        if render_events(conversation).await {
            prompt_for_credential(&mut editor, conversation).await;
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Render pending events. Returns `true` if a credential was requested.
async fn render_events(conversation: &Conversation) -> bool {
    let mut need_credential = false;
    for event in conversation.bus().drain().await {
        match event {
            // The user's own line is already on screen.
            ChatEvent::TurnAppended {
                role: Role::User, ..
            } => {}
            ChatEvent::TurnAppended { role, text } => helpers::print_turn(role, &text),
            ChatEvent::ModelResolved { model } => {
                println!("  {}", format!("using model {model}").dimmed());
            }
            ChatEvent::NeedCredential => need_credential = true,
            ChatEvent::Completed { ok } => debug!(ok, "request completed"),
        }
    }
    need_credential
}

/// Ask for an API key (and optional model) on the terminal.
async fn prompt_for_credential(editor: &mut Editor<(), DefaultHistory>, conversation: &Conversation) {
    println!("{}", "An API key is required to chat.".yellow());
    let key = match editor.readline("API key: ") {
        Ok(line) => line,
        Err(_) => return,
    };
    if key.trim().is_empty() {
        println!("  {}", "No key entered; use /key KEY [MODEL] later.".dimmed());
        return;
    }
    let model = editor.readline("Model (optional): ").unwrap_or_default();
    let model = model.trim();
    apply_credential(conversation, key.trim(), (!model.is_empty()).then_some(model)).await;
}

async fn apply_credential(conversation: &Conversation, key: &str, model: Option<&str>) {
    match conversation.set_credential(key, model).await {
        Ok(model) => {
            // ModelResolved would repeat what is printed here.
            conversation.bus().drain().await;
            println!(
                "  {} key {} saved, model: {}",
                "✓".green(),
                mask_secret(key),
                model.bold()
            );
        }
        Err(e) => eprintln!("  {} {e}", "✗".red()),
    }
}

/// Classify one non-empty input line.
fn parse_command(input: &str) -> ReplCommand<'_> {
    if is_exit_command(input) {
        return ReplCommand::Exit;
    }
    if !input.starts_with('/') {
        return ReplCommand::Message(input);
    }

    let mut parts = input.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match name {
        "/key" => match (parts.next(), parts.next(), parts.next()) {
            (Some(key), model, None) => ReplCommand::Key { key, model },
            _ => ReplCommand::Usage("usage: /key KEY [MODEL]"),
        },
        "/model" => ReplCommand::Model,
        "/history" => ReplCommand::History,
        _ => ReplCommand::Usage("commands: /key KEY [MODEL], /model, /history, exit"),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    chatrelay_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
