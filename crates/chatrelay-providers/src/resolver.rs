//! Model resolution: decides which catalog model a session addresses.
//!
//! Selection order (see [`ModelPolicy::select_preferred`]):
//! 1. First entry of the preference list that the catalog offers
//! 2. First usable model in the fast-tier family
//! 3. First usable model in catalog order
//!
//! A model that has already been chosen is kept as long as the catalog still
//! lists it as usable; it is re-checked on first use in the process and then
//! at most once per revalidation window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use chatrelay_core::config::ResolverSettings;
use chatrelay_core::session::{CredentialCache, Session};
use chatrelay_core::types::strip_model_prefix;
use chatrelay_core::{ChatError, ModelDescriptor};

use crate::traits::GenerativeBackend;

// ─────────────────────────────────────────────
// ModelPolicy: pure selection logic
// ─────────────────────────────────────────────

/// Ordered preferences plus the fast-tier fallback pattern.
#[derive(Clone, Debug)]
pub struct ModelPolicy {
    preferred: Vec<String>,
    fast_tier: Regex,
}

impl ModelPolicy {
    /// Build a policy. Preference entries may carry the `models/` prefix.
    /// The fast-tier pattern always matches case-insensitively.
    pub fn new<I, S>(preferred: I, fast_tier_pattern: &str) -> Result<Self, ChatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fast_tier = RegexBuilder::new(fast_tier_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ChatError::Config(format!("invalid fast-tier pattern {fast_tier_pattern:?}: {e}"))
            })?;
        let preferred = preferred
            .into_iter()
            .map(|m| strip_model_prefix(m.as_ref().trim()).to_string())
            .filter(|m| !m.is_empty())
            .collect();
        Ok(Self {
            preferred,
            fast_tier,
        })
    }

    pub fn from_settings(settings: &ResolverSettings) -> Result<Self, ChatError> {
        Self::new(&settings.preferred_models, &settings.fast_tier_pattern)
    }

    /// Preference list, prefix-stripped, highest priority first.
    pub fn preferred(&self) -> &[String] {
        &self.preferred
    }

    /// Whether a (prefix-stripped or full) model name is in the fast tier.
    pub fn is_fast_tier(&self, name: &str) -> bool {
        self.fast_tier.is_match(strip_model_prefix(name))
    }

    /// Pick a model from a catalog listing. Returns the prefix-stripped name,
    /// or `None` when nothing in `descriptors` is usable.
    pub fn select_preferred(&self, descriptors: &[ModelDescriptor]) -> Option<String> {
        let usable: Vec<&ModelDescriptor> = descriptors.iter().filter(|d| d.is_usable()).collect();

        for wanted in &self.preferred {
            if let Some(found) = usable.iter().find(|d| d.short_name() == wanted.as_str()) {
                return Some(found.short_name().to_string());
            }
        }

        usable
            .iter()
            .find(|d| self.is_fast_tier(d.short_name()))
            .or_else(|| usable.first())
            .map(|d| d.short_name().to_string())
    }
}

// ─────────────────────────────────────────────
// ModelResolver: catalog-backed resolution for a session
// ─────────────────────────────────────────────

/// Resolves and validates the model a session addresses.
pub struct ModelResolver {
    backend: Arc<dyn GenerativeBackend>,
    policy: ModelPolicy,
    /// Zero means the catalog is consulted on every call.
    revalidate_after: Duration,
}

impl ModelResolver {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        policy: ModelPolicy,
        revalidate_after: Duration,
    ) -> Self {
        Self {
            backend,
            policy,
            revalidate_after,
        }
    }

    /// Resolver configured from `resolver` settings.
    pub fn from_settings(
        backend: Arc<dyn GenerativeBackend>,
        settings: &ResolverSettings,
    ) -> Result<Self, ChatError> {
        Ok(Self::new(
            backend,
            ModelPolicy::from_settings(settings)?,
            Duration::from_secs(settings.revalidate_after_secs),
        ))
    }

    /// Usable catalog entries, in catalog order.
    pub async fn list_capable_models(
        &self,
        api_key: &str,
    ) -> Result<Vec<ModelDescriptor>, ChatError> {
        let all = self.backend.list_models(api_key).await?;
        let total = all.len();
        let usable: Vec<ModelDescriptor> = all.into_iter().filter(|d| d.is_usable()).collect();
        debug!(
            backend = self.backend.display_name(),
            total,
            usable = usable.len(),
            "catalog filtered"
        );
        Ok(usable)
    }

    /// See [`ModelPolicy::select_preferred`].
    pub fn select_preferred(&self, descriptors: &[ModelDescriptor]) -> Option<String> {
        self.policy.select_preferred(descriptors)
    }

    /// Return the model the session should address, consulting the catalog
    /// when the stored choice is missing or its validation has expired.
    ///
    /// A newly selected model is written to the session and to `cache`.
    pub async fn ensure_model(
        &self,
        session: &mut Session,
        cache: &CredentialCache,
    ) -> Result<String, ChatError> {
        let api_key = session
            .api_key()
            .ok_or(ChatError::MissingCredential)?
            .to_string();

        if let Some(model) = session.model() {
            if self.is_fresh(session) {
                debug!(model = %model, "model validated recently, skipping catalog");
                return Ok(strip_model_prefix(model).to_string());
            }
        }

        let usable = self.list_capable_models(&api_key).await?;

        if let Some(stored) = session.model().map(|m| strip_model_prefix(m).to_string()) {
            if usable.iter().any(|d| d.short_name() == stored) {
                debug!(model = %stored, "stored model still available");
                session.model_checked_at = Some(Utc::now());
                return Ok(stored);
            }
            warn!(model = %stored, "stored model is no longer available, reselecting");
        }

        let Some(selected) = self.policy.select_preferred(&usable) else {
            warn!("catalog lists no generation-capable model");
            return Err(ChatError::NoUsableModel);
        };

        info!(model = %selected, "model selected");
        session.credentials.model = Some(selected.clone());
        session.model_checked_at = Some(Utc::now());
        cache.save_model(&selected);
        Ok(selected)
    }

    /// Force the next [`ensure_model`](Self::ensure_model) to query the catalog.
    pub fn invalidate(&self, session: &mut Session) {
        session.model_checked_at = None;
    }

    fn is_fresh(&self, session: &Session) -> bool {
        if self.revalidate_after.is_zero() {
            return false;
        }
        let Some(checked_at) = session.model_checked_at else {
            return false;
        };
        let age = Utc::now().signed_duration_since(checked_at);
        age.to_std().is_ok_and(|age| age < self.revalidate_after)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiClient;
    use async_trait::async_trait;
    use chatrelay_core::config::ProviderSettings;
    use chatrelay_core::session::{Credentials, KeyValueStore, MemoryStore};
    use chatrelay_core::Turn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn default_policy() -> ModelPolicy {
        ModelPolicy::from_settings(&ResolverSettings::default()).unwrap()
    }

    fn usable(name: &str) -> ModelDescriptor {
        ModelDescriptor::new(name, ["generateContent", "countTokens"])
    }

    fn embed_only(name: &str) -> ModelDescriptor {
        ModelDescriptor::new(name, ["embedContent"])
    }

    /// Backend serving a fixed catalog and counting catalog queries.
    struct StaticCatalog {
        models: Vec<ModelDescriptor>,
        queries: AtomicUsize,
    }

    impl StaticCatalog {
        fn new(models: Vec<ModelDescriptor>) -> Arc<Self> {
            Arc::new(Self {
                models,
                queries: AtomicUsize::new(0),
            })
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeBackend for StaticCatalog {
        async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelDescriptor>, ChatError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.models.clone())
        }

        async fn generate(
            &self,
            _turns: &[Turn],
            _system_prompt: &str,
            _model: &str,
            _api_key: &str,
        ) -> Result<String, ChatError> {
            Ok("unused".into())
        }

        fn display_name(&self) -> &str {
            "static"
        }
    }

    fn resolver(backend: Arc<StaticCatalog>, revalidate_secs: u64) -> ModelResolver {
        ModelResolver::new(
            backend,
            default_policy(),
            Duration::from_secs(revalidate_secs),
        )
    }

    fn keyed_session(model: Option<&str>) -> Session {
        Session::new(
            "sys",
            Credentials {
                api_key: Some("k".into()),
                model: model.map(String::from),
            },
        )
    }

    fn memory_cache() -> (Arc<MemoryStore>, CredentialCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = CredentialCache::new(store.clone());
        (store, cache)
    }

    // ── ModelPolicy ──

    #[test]
    fn test_select_first_preference_present() {
        let policy = default_policy();
        let catalog = vec![
            usable("models/gemini-1.5-pro"),
            usable("models/gemini-2.0-flash"),
            usable("models/gemini-2.5-flash"),
        ];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("gemini-2.5-flash")
        );
    }

    #[test]
    fn test_select_is_deterministic() {
        let policy = default_policy();
        let catalog = vec![usable("models/gemini-2.0-flash"), usable("models/gemini-2.5-flash")];
        let first = policy.select_preferred(&catalog);
        for _ in 0..5 {
            assert_eq!(policy.select_preferred(&catalog), first);
        }
    }

    #[test]
    fn test_select_ignores_unusable_preference() {
        let policy = default_policy();
        let catalog = vec![
            embed_only("models/gemini-2.5-flash"),
            usable("models/gemini-2.0-flash"),
        ];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("gemini-2.0-flash")
        );
    }

    #[test]
    fn test_select_fast_tier_fallback() {
        let policy = default_policy();
        let catalog = vec![
            usable("models/gemini-pro"),
            usable("models/gemini-1.5-flash-8b"),
            usable("models/gemini-2.6-flash-latest"),
        ];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("gemini-2.6-flash-latest")
        );
    }

    #[test]
    fn test_select_first_usable_fallback() {
        let policy = default_policy();
        let catalog = vec![
            embed_only("models/text-embedding-004"),
            usable("models/gemini-1.5-flash-8b"),
        ];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("gemini-1.5-flash-8b")
        );
    }

    #[test]
    fn test_select_none_when_nothing_usable() {
        let policy = default_policy();
        assert_eq!(policy.select_preferred(&[]), None);
        assert_eq!(
            policy.select_preferred(&[embed_only("models/text-embedding-004")]),
            None
        );
    }

    #[test]
    fn test_fast_tier_pattern() {
        let policy = default_policy();
        assert!(policy.is_fast_tier("gemini-2.0-flash"));
        assert!(policy.is_fast_tier("models/gemini-1.5-flash-002"));
        assert!(policy.is_fast_tier("Gemini-2.5-Flash-Lite"));
        assert!(!policy.is_fast_tier("gemini-1.5-flash-8b"));
        assert!(!policy.is_fast_tier("gemini-1.5-pro"));
    }

    #[test]
    fn test_custom_preferences_strip_prefix() {
        let policy =
            ModelPolicy::new(["models/gemini-1.5-pro", " "], r"(?i)flash").unwrap();
        assert_eq!(policy.preferred(), ["gemini-1.5-pro"]);
        let catalog = vec![usable("models/gemini-2.0-flash"), usable("models/gemini-1.5-pro")];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("gemini-1.5-pro")
        );
    }

    #[test]
    fn test_custom_pattern_ignores_case() {
        let policy =
            ModelPolicy::new(Vec::<String>::new(), r"gemini-[0-9.]+-flash$").unwrap();
        let catalog = vec![
            usable("models/gemini-1.5-pro"),
            usable("models/Gemini-2.0-FLASH"),
        ];
        assert_eq!(
            policy.select_preferred(&catalog).as_deref(),
            Some("Gemini-2.0-FLASH")
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = ModelPolicy::new(Vec::<String>::new(), "(unclosed").unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    // ── ModelResolver ──

    #[tokio::test]
    async fn test_list_capable_models_filters() {
        let backend = StaticCatalog::new(vec![
            embed_only("models/text-embedding-004"),
            usable("models/gemini-2.0-flash"),
        ]);
        let resolver = resolver(backend, 600);
        let models = resolver.list_capable_models("k").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "models/gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_ensure_model_selects_and_persists() {
        let backend = StaticCatalog::new(vec![usable("models/gemini-2.5-flash")]);
        let resolver = resolver(backend, 600);
        let (store, cache) = memory_cache();
        let mut session = keyed_session(None);

        let model = resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(model, "gemini-2.5-flash");
        assert_eq!(session.model(), Some("gemini-2.5-flash"));
        assert!(session.model_checked_at.is_some());
        assert_eq!(store.get("GEMINI_MODEL").as_deref(), Some("gemini-2.5-flash"));
    }

    #[tokio::test]
    async fn test_ensure_model_keeps_available_stored_model() {
        let backend = StaticCatalog::new(vec![
            usable("models/gemini-2.5-flash"),
            usable("models/gemini-1.5-pro"),
        ]);
        let resolver = resolver(backend, 600);
        let (store, cache) = memory_cache();
        let mut session = keyed_session(Some("models/gemini-1.5-pro"));

        let model = resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(model, "gemini-1.5-pro");
        // Nothing new was chosen, nothing written.
        assert_eq!(store.get("GEMINI_MODEL"), None);
    }

    #[tokio::test]
    async fn test_ensure_model_replaces_retired_model() {
        let backend = StaticCatalog::new(vec![usable("models/gemini-2.0-flash")]);
        let resolver = resolver(backend, 600);
        let (store, cache) = memory_cache();
        let mut session = keyed_session(Some("gemini-3-flash"));

        let model = resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(model, "gemini-2.0-flash");
        assert_eq!(store.get("GEMINI_MODEL").as_deref(), Some("gemini-2.0-flash"));
    }

    #[tokio::test]
    async fn test_ensure_model_skips_catalog_within_window() {
        let backend = StaticCatalog::new(vec![usable("models/gemini-2.5-flash")]);
        let resolver = resolver(backend.clone(), 600);
        let (_store, cache) = memory_cache();
        let mut session = keyed_session(None);

        resolver.ensure_model(&mut session, &cache).await.unwrap();
        resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(backend.queries(), 1);

        resolver.invalidate(&mut session);
        resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(backend.queries(), 2);
    }

    #[tokio::test]
    async fn test_ensure_model_zero_window_always_queries() {
        let backend = StaticCatalog::new(vec![usable("models/gemini-2.5-flash")]);
        let resolver = resolver(backend.clone(), 0);
        let (_store, cache) = memory_cache();
        let mut session = keyed_session(None);

        resolver.ensure_model(&mut session, &cache).await.unwrap();
        resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(backend.queries(), 2);
    }

    #[tokio::test]
    async fn test_ensure_model_no_usable_model() {
        let backend = StaticCatalog::new(vec![embed_only("models/text-embedding-004")]);
        let resolver = resolver(backend, 600);
        let (store, cache) = memory_cache();
        let mut session = keyed_session(None);

        let err = resolver.ensure_model(&mut session, &cache).await.unwrap_err();
        assert_eq!(err, ChatError::NoUsableModel);
        assert_eq!(session.model(), None);
        assert_eq!(store.get("GEMINI_MODEL"), None);
    }

    #[tokio::test]
    async fn test_ensure_model_without_key() {
        let backend = StaticCatalog::new(vec![usable("models/gemini-2.5-flash")]);
        let resolver = resolver(backend.clone(), 600);
        let (_store, cache) = memory_cache();
        let mut session = Session::new("sys", Credentials::default());

        let err = resolver.ensure_model(&mut session, &cache).await.unwrap_err();
        assert_eq!(err, ChatError::MissingCredential);
        assert_eq!(backend.queries(), 0);
    }

    #[tokio::test]
    async fn test_ensure_model_over_http_falls_back_to_sized_variant() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]},
                    {"name": "models/gemini-1.5-flash-8b", "supportedGenerationMethods": ["generateContent"]}
                ]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&ProviderSettings {
            api_base: server.uri(),
            ..ProviderSettings::default()
        })
        .unwrap();
        let resolver = ModelResolver::from_settings(Arc::new(client), &ResolverSettings::default())
            .unwrap();
        let (_store, cache) = memory_cache();
        let mut session = keyed_session(None);

        let model = resolver.ensure_model(&mut session, &cache).await.unwrap();
        assert_eq!(model, "gemini-1.5-flash-8b");
    }

    #[tokio::test]
    async fn test_ensure_model_propagates_catalog_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "API key expired."}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&ProviderSettings {
            api_base: server.uri(),
            ..ProviderSettings::default()
        })
        .unwrap();
        let resolver = ModelResolver::from_settings(Arc::new(client), &ResolverSettings::default())
            .unwrap();
        let (_store, cache) = memory_cache();
        let mut session = keyed_session(Some("gemini-2.5-flash"));

        let err = resolver.ensure_model(&mut session, &cache).await.unwrap_err();
        assert_eq!(err, ChatError::upstream(403, "API key expired."));
        assert!(session.model_checked_at.is_none());
    }
}
