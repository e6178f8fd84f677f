//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderSettings`, `ResolverSettings`, `WidgetSettings`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

/// Default Generative Language API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Preferred models, highest priority first.
pub const DEFAULT_PREFERRED_MODELS: &[&str] = &[
    "gemini-3-flash",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
];

/// Plain flash family (optionally `-lite`, `-latest` or a `-NNN` revision);
/// sized variants such as `-8b` do not match.
pub const DEFAULT_FAST_TIER_PATTERN: &str =
    r"(?i)^gemini-[0-9.]+-flash(-lite)?(-latest|-[0-9]{3})?$";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.chatrelay/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub resolver: ResolverSettings,
    pub widget: WidgetSettings,
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Where and how to reach the Generative Language API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API base URL, without a trailing `/models`.
    pub api_base: String,
    /// Upper bound for any single HTTP request, in seconds.
    pub timeout_secs: u64,
    /// Maximum catalog pages followed through `nextPageToken`.
    pub max_catalog_pages: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 60,
            max_catalog_pages: 10,
        }
    }
}

// ─────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────

/// Model selection policy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverSettings {
    /// Exact model names, highest priority first (with or without `models/`).
    pub preferred_models: Vec<String>,
    /// Regex for the fast-tier family, tried when no preferred model is available.
    pub fast_tier_pattern: String,
    /// How long a validated model is trusted before the catalog is queried again.
    pub revalidate_after_secs: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            preferred_models: DEFAULT_PREFERRED_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            fast_tier_pattern: DEFAULT_FAST_TIER_PATTERN.to_string(),
            revalidate_after_secs: 600,
        }
    }
}

// ─────────────────────────────────────────────
// Widget
// ─────────────────────────────────────────────

/// Text supplied by the embedding front-end at session start.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSettings {
    pub system_prompt: String,
    pub greeting: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            greeting: "Hi! How can I help?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.api_base, DEFAULT_API_BASE);
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.resolver.preferred_models[1], "gemini-2.5-flash");
        assert_eq!(config.resolver.revalidate_after_secs, 600);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider": {"timeoutSecs": 5}}"#).unwrap();
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(config.provider.api_base, DEFAULT_API_BASE);
        assert_eq!(config.widget, WidgetSettings::default());
    }
}
