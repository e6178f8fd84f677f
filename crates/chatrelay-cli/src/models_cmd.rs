//! `chatrelay models`: list generation-capable models for the stored key.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use chatrelay_core::config::Config;
use chatrelay_core::session::CredentialCache;
use chatrelay_core::types::strip_model_prefix;
use chatrelay_core::ModelDescriptor;

/// Run the models command.
pub async fn run(config: &Config, session: &str) -> Result<()> {
    let credentials = CredentialCache::new(crate::open_store(session, false)?).load();
    let Some(api_key) = credentials.api_key.as_deref() else {
        bail!("no API key for session {session:?}; run `chatrelay login -k KEY` first");
    };

    let (_backend, resolver) = crate::build_backend(config)?;
    let models = resolver
        .list_capable_models(api_key)
        .await
        .context("failed to query the model catalog")?;

    let selected = resolver.select_preferred(&models);
    let stored = credentials.model.as_deref().map(strip_model_prefix);

    println!();
    println!(
        "{} ({} usable)",
        "Available models".cyan().bold(),
        models.len()
    );
    println!();
    for line in render_rows(&models, selected.as_deref(), stored) {
        println!("{line}");
    }
    println!();
    println!(
        "  {}",
        "★ preferred by policy   ● stored for this session".dimmed()
    );
    println!();

    Ok(())
}

/// One line per model: markers, then the short name.
fn render_rows(models: &[ModelDescriptor], selected: Option<&str>, stored: Option<&str>) -> Vec<String> {
    models
        .iter()
        .map(|model| {
            let name = model.short_name();
            let preferred = if Some(name) == selected { "★" } else { " " };
            let current = if Some(name) == stored { "●" } else { " " };
            format!("  {preferred}{current} {name}")
        })
        .collect()
}
