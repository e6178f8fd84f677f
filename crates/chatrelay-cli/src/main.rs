//! Chatrelay CLI: entry point.
//!
//! # Commands
//!
//! - `chatrelay chat [-m MESSAGE] [-s SESSION]`: chat (single-shot or REPL)
//! - `chatrelay login -k KEY [-m MODEL]`: store an API key and resolve a model
//! - `chatrelay models`: list generation-capable models for the stored key
//! - `chatrelay status`: show configuration and session status
//! - `chatrelay onboard`: write a default config file

mod helpers;
mod models_cmd;
mod onboard;
mod repl;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use chatrelay_core::bus::EventBus;
use chatrelay_core::config::{load_config, Config};
use chatrelay_core::session::{CredentialCache, FileStore, KeyValueStore, MemoryStore};
use chatrelay_core::utils::session_store_path;
use chatrelay_core::ChatError;
use chatrelay_engine::{Conversation, TurnOutcome};
use chatrelay_providers::{GeminiClient, GenerativeBackend, ModelResolver};

/// Default session identifier.
const DEFAULT_SESSION: &str = "default";

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Chatrelay: terminal chat against the Gemini API
#[derive(Parser)]
#[command(name = "chatrelay", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.chatrelay/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Session identifier (selects the credential store)
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,

        /// System prompt (overrides `widget.systemPrompt`)
        #[arg(long)]
        system: Option<String>,

        /// Greeting shown at session start (overrides `widget.greeting`)
        #[arg(long)]
        greeting: Option<String>,

        /// Keep credentials in memory only
        #[arg(long, default_value_t = false)]
        ephemeral: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Emit logs as JSON lines
        #[arg(long, default_value_t = false)]
        json_logs: bool,
    },

    /// Store an API key (and optionally a model) for a session
    Login {
        /// API key
        #[arg(short, long)]
        key: String,

        /// Requested model; replaced if the catalog does not offer it
        #[arg(short, long)]
        model: Option<String>,

        /// Session identifier
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// List generation-capable models for the stored API key
    Models {
        /// Session identifier
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Show configuration and session status
    Status {
        /// Session identifier
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Write a default configuration file
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Chat {
            message,
            session,
            system,
            greeting,
            ephemeral,
            logs,
            json_logs,
        } => {
            init_logging(logs, json_logs);
            let config = load_config(config_path.as_deref());
            let options = ChatOptions {
                session,
                system_prompt: system.unwrap_or_else(|| config.widget.system_prompt.clone()),
                greeting: greeting.unwrap_or_else(|| config.widget.greeting.clone()),
                ephemeral,
            };
            run_chat(&config, message, options).await
        }
        Commands::Login {
            key,
            model,
            session,
        } => {
            init_logging(false, false);
            let config = load_config(config_path.as_deref());
            run_login(&config, &session, &key, model.as_deref()).await
        }
        Commands::Models { session } => {
            init_logging(false, false);
            let config = load_config(config_path.as_deref());
            models_cmd::run(&config, &session).await
        }
        Commands::Status { session } => status::run(config_path.as_deref(), &session),
        Commands::Onboard => onboard::run(config_path.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

/// Session parameters for `chatrelay chat`.
struct ChatOptions {
    session: String,
    system_prompt: String,
    greeting: String,
    ephemeral: bool,
}

async fn run_chat(config: &Config, message: Option<String>, options: ChatOptions) -> Result<()> {
    let conversation = build_conversation(config, &options.session, options.ephemeral)?;
    conversation
        .init_session(&options.system_prompt, &options.greeting)
        .await
        .context("failed to start session")?;

    match message {
        Some(msg) => {
            // Single-shot mode: the greeting and prompts are for humans at a REPL.
            info!(session = %options.session, "processing single message");
            conversation.bus().drain().await;
            match conversation.submit_turn(&msg).await {
                Ok(TurnOutcome::Replied(reply)) => helpers::print_reply(&reply),
                Ok(TurnOutcome::Failed(err)) => bail!("request failed: {err}"),
                Ok(TurnOutcome::Ignored) => bail!("message is empty"),
                Err(ChatError::MissingCredential) => bail!(
                    "no API key for session {:?}; run `chatrelay login -k KEY` first",
                    options.session
                ),
                Err(e) => return Err(e).context("chat failed"),
            }
        }
        None => {
            repl::run(&conversation, &options.session).await?;
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────
// Login command
// ─────────────────────────────────────────────

async fn run_login(config: &Config, session: &str, key: &str, model: Option<&str>) -> Result<()> {
    let conversation = build_conversation(config, session, false)?;
    conversation
        .init_session(&config.widget.system_prompt, "")
        .await
        .context("failed to start session")?;

    let resolved = conversation
        .set_credential(key, model)
        .await
        .context("credential check failed")?;

    println!(
        "  {} API key saved for session {}",
        "✓".green(),
        session.bold()
    );
    if let Some(requested) = model.map(str::trim).filter(|m| !m.is_empty()) {
        if chatrelay_core::types::strip_model_prefix(requested) != resolved {
            println!(
                "  {} {} is not available, using {}",
                "!".yellow(),
                requested,
                resolved.bold()
            );
            return Ok(());
        }
    }
    println!("  {} model: {}", "✓".green(), resolved.bold());
    Ok(())
}

// ─────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────

/// Open the credential store for a session.
pub fn open_store(session: &str, ephemeral: bool) -> Result<Arc<dyn KeyValueStore>> {
    if ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path: PathBuf = session_store_path(session);
    let store = FileStore::open(&path)
        .with_context(|| format!("failed to open session store: {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Build the Gemini backend and model resolver from configuration.
pub fn build_backend(config: &Config) -> Result<(Arc<dyn GenerativeBackend>, ModelResolver)> {
    let backend: Arc<dyn GenerativeBackend> =
        Arc::new(GeminiClient::new(&config.provider).context("invalid provider settings")?);
    let resolver = ModelResolver::from_settings(backend.clone(), &config.resolver)
        .context("invalid resolver settings")?;
    Ok((backend, resolver))
}

/// Build a `Conversation` from the loaded configuration.
pub fn build_conversation(config: &Config, session: &str, ephemeral: bool) -> Result<Conversation> {
    let (backend, resolver) = build_backend(config)?;
    let cache = CredentialCache::new(open_store(session, ephemeral)?);
    Ok(Conversation::new(
        backend,
        resolver,
        cache,
        Arc::new(EventBus::new()),
    ))
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise `--logs` selects debug output for
/// Chatrelay crates.
fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("chatrelay=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
