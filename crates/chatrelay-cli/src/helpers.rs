//! Shared CLI helpers: path expansion, turn printing, banner.

use std::path::PathBuf;

use colored::Colorize;

use chatrelay_core::{Role, Turn};

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print an assistant reply to stdout.
pub fn print_reply(reply: &str) {
    println!();
    println!("{}", "Assistant".cyan().bold());
    if reply.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{reply}");
    }
    println!();
}

/// Print one transcript turn; error turns are highlighted.
pub fn print_turn(role: Role, text: &str) {
    match role {
        Role::User => println!("{} {}", "You:".green().bold(), text),
        Role::Assistant if text.starts_with(chatrelay_engine::ERROR_PREFIX) => {
            println!();
            println!("{}", text.red());
            println!();
        }
        Role::Assistant => print_reply(text),
    }
}

/// Print a whole transcript.
pub fn print_transcript(turns: &[Turn]) {
    if turns.is_empty() {
        println!("{}", "(empty transcript)".dimmed());
        return;
    }
    for turn in turns {
        print_turn(turn.role, &turn.text);
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(session: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "Chatrelay".cyan().bold(),
        version.dimmed(),
        format!("session: {session}").dimmed()
    );
    println!(
        "{}",
        "Type a message, /key KEY [MODEL], /model, /history, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
