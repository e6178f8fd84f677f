//! `chatrelay status`: show configuration and session status.
//!
//! - Config path, API base, timeout, model preferences
//! - Session store path, API key presence (masked), stored model

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use chatrelay_core::config::{get_config_path, load_config};
use chatrelay_core::session::{CredentialCache, Credentials};
use chatrelay_core::utils::{mask_secret, session_store_path};

/// Run the status command.
pub fn run(config_path: Option<&Path>, session: &str) -> Result<()> {
    let config = load_config(config_path);
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "Chatrelay Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        found_marker(&config_path)
    );
    println!("  {:<18} {}", "API base:".bold(), config.provider.api_base);
    println!(
        "  {:<18} {}",
        "Timeout:".bold(),
        format!("{}s", config.provider.timeout_secs).dimmed()
    );
    println!(
        "  {:<18} {}",
        "Preferred models:".bold(),
        config.resolver.preferred_models.join(", ").dimmed()
    );

    // Session
    println!();
    println!("  {} {}", "Session:".bold(), session);
    let store_path = session_store_path(session);
    println!(
        "    {:<16} {} {}",
        "Store:",
        store_path.display(),
        found_marker(&store_path)
    );

    let credentials = if store_path.exists() {
        crate::open_store(session, false)
            .map(|store| CredentialCache::new(store).load())
            .unwrap_or_default()
    } else {
        Credentials::default()
    };

    let key_status = match credentials.api_key.as_deref() {
        Some(key) => format!("{} {}", "✓".green(), mask_secret(key).dimmed()),
        None => format!("{}", "· not configured".dimmed()),
    };
    println!("    {:<16} {}", "API key:", key_status);

    let model_status = match credentials.model.as_deref() {
        Some(model) => model.to_string(),
        None => format!("{}", "· resolved on first use".dimmed()),
    };
    println!("    {:<16} {}", "Model:", model_status);

    println!();

    Ok(())
}

fn found_marker(path: &Path) -> String {
    if path.exists() {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}
