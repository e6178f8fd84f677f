//! Config loader: reads `~/.chatrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.chatrelay/config.json`
//! 3. Environment variables `CHATRELAY_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or `path`) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = load_config_from_path(&config_path);
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply `CHATRELAY_<SECTION>__<FIELD>` overrides on top of a loaded config.
///
/// Supported overrides:
/// - `CHATRELAY_PROVIDER__API_BASE` → `provider.api_base`
/// - `CHATRELAY_PROVIDER__TIMEOUT_SECS` → `provider.timeout_secs`
/// - `CHATRELAY_PROVIDER__MAX_CATALOG_PAGES` → `provider.max_catalog_pages`
/// - `CHATRELAY_RESOLVER__PREFERRED_MODELS` (comma-separated) → `resolver.preferred_models`
/// - `CHATRELAY_RESOLVER__FAST_TIER_PATTERN` → `resolver.fast_tier_pattern`
/// - `CHATRELAY_RESOLVER__REVALIDATE_AFTER_SECS` → `resolver.revalidate_after_secs`
/// - `CHATRELAY_WIDGET__SYSTEM_PROMPT` → `widget.system_prompt`
/// - `CHATRELAY_WIDGET__GREETING` → `widget.greeting`
///
/// Values that fail to parse are ignored with a warning.
fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    // Provider
    if let Some(val) = lookup("CHATRELAY_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }
    if let Some(n) = parse_var(&lookup, "CHATRELAY_PROVIDER__TIMEOUT_SECS") {
        config.provider.timeout_secs = n;
    }
    if let Some(n) = parse_var(&lookup, "CHATRELAY_PROVIDER__MAX_CATALOG_PAGES") {
        config.provider.max_catalog_pages = n;
    }

    // Resolver
    if let Some(val) = lookup("CHATRELAY_RESOLVER__PREFERRED_MODELS") {
        config.resolver.preferred_models = val
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(val) = lookup("CHATRELAY_RESOLVER__FAST_TIER_PATTERN") {
        config.resolver.fast_tier_pattern = val;
    }
    if let Some(n) = parse_var(&lookup, "CHATRELAY_RESOLVER__REVALIDATE_AFTER_SECS") {
        config.resolver.revalidate_after_secs = n;
    }

    // Widget
    if let Some(val) = lookup("CHATRELAY_WIDGET__SYSTEM_PROMPT") {
        config.widget.system_prompt = val;
    }
    if let Some(val) = lookup("CHATRELAY_WIDGET__GREETING") {
        config.widget.greeting = val;
    }

    config
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}: cannot parse {:?}", name, raw);
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_API_BASE;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "provider": { "apiBase": "http://localhost:9000/v1beta", "timeoutSecs": 15 },
            "widget": { "greeting": "Welcome!" }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.provider.api_base, "http://localhost:9000/v1beta");
        assert_eq!(config.provider.timeout_secs, 15);
        assert_eq!(config.widget.greeting, "Welcome!");
        // Defaults preserved
        assert_eq!(config.provider.max_catalog_pages, 10);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.resolver.preferred_models = vec!["gemini-2.0-flash".into()];
        config.widget.system_prompt = "Answer in French.".into();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&Config::default(), Some(&path)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["provider"].get("timeoutSecs").is_some());
        assert!(raw["resolver"].get("preferred_models").is_none());
    }

    #[test]
    fn test_override_api_base_and_timeout() {
        let config = apply_overrides(
            Config::default(),
            vars(&[
                ("CHATRELAY_PROVIDER__API_BASE", "http://127.0.0.1:8080"),
                ("CHATRELAY_PROVIDER__TIMEOUT_SECS", "7"),
            ]),
        );
        assert_eq!(config.provider.api_base, "http://127.0.0.1:8080");
        assert_eq!(config.provider.timeout_secs, 7);
    }

    #[test]
    fn test_override_preferred_models_list() {
        let config = apply_overrides(
            Config::default(),
            vars(&[(
                "CHATRELAY_RESOLVER__PREFERRED_MODELS",
                " gemini-2.0-flash, ,models/gemini-1.5-pro ",
            )]),
        );
        assert_eq!(
            config.resolver.preferred_models,
            vec!["gemini-2.0-flash", "models/gemini-1.5-pro"]
        );
    }

    #[test]
    fn test_override_unparseable_number_ignored() {
        let config = apply_overrides(
            Config::default(),
            vars(&[("CHATRELAY_RESOLVER__REVALIDATE_AFTER_SECS", "soon")]),
        );
        assert_eq!(config.resolver.revalidate_after_secs, 600);
        assert_eq!(config.provider.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_override_widget_text() {
        let config = apply_overrides(
            Config::default(),
            vars(&[
                ("CHATRELAY_WIDGET__SYSTEM_PROMPT", "Be terse."),
                ("CHATRELAY_WIDGET__GREETING", "Yo."),
            ]),
        );
        assert_eq!(config.widget.system_prompt, "Be terse.");
        assert_eq!(config.widget.greeting, "Yo.");
    }
}
