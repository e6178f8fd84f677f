//! `chatrelay onboard`: initialize configuration and data directories.
//!
//! - Creates `~/.chatrelay/config.json` with defaults
//! - Creates the sessions and history directories

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use chatrelay_core::config::{get_config_path, save_config, Config};
use chatrelay_core::utils::{get_data_path, get_sessions_path};

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "Chatrelay Setup".cyan().bold());
    println!();

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    // 1. Create config if it doesn't exist
    if write_default_config(&config_path)? {
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    // 2. Create sessions + history directories
    let sessions_dir = get_sessions_path();
    std::fs::create_dir_all(&sessions_dir)
        .with_context(|| format!("failed to create {}", sessions_dir.display()))?;
    let history_dir = get_data_path().join("history");
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;
    println!("  {} sessions at {}", "✓".green(), sessions_dir.display());

    println!();
    println!(
        "{}",
        "  Setup complete! Run `chatrelay login -k KEY`, then `chatrelay chat`.".green()
    );
    println!();

    Ok(())
}

/// Write a default config file unless one exists. Returns `true` if written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert!(write_default_config(&path).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("generativelanguage.googleapis.com"));

        // Should NOT overwrite
        std::fs::write(&path, "{}").unwrap();
        assert!(!write_default_config(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
