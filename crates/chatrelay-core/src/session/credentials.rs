//! Credential cache: the `{key, model}` pair that survives restarts within a
//! session.
//!
//! This is not storage of record. It exists so a user does not re-enter the
//! API key on every start. Write failures are logged and otherwise ignored.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::store::KeyValueStore;

/// Store entry holding the raw API key.
pub const API_KEY_ENTRY: &str = "GEMINI_API_KEY";
/// Store entry holding the raw model name.
pub const MODEL_ENTRY: &str = "GEMINI_MODEL";

/// API key and model choice. Both optional; the key is opaque.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl Credentials {
    /// Whether a non-blank API key is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Loads and saves [`Credentials`] through a session-scoped store.
#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("location", &self.store.location())
            .finish()
    }
}

impl CredentialCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read both entries. Absent or blank entries come back as `None`.
    pub fn load(&self) -> Credentials {
        let read = |entry: &str| self.store.get(entry).filter(|v| !v.trim().is_empty());
        let credentials = Credentials {
            api_key: read(API_KEY_ENTRY),
            model: read(MODEL_ENTRY),
        };
        debug!(
            has_key = credentials.api_key.is_some(),
            model = credentials.model.as_deref().unwrap_or("-"),
            "Loaded credentials"
        );
        credentials
    }

    /// Write both entries.
    ///
    /// A field is written only when it is present and non-blank; otherwise the
    /// previously stored value stays untouched.
    pub fn save(&self, credentials: &Credentials) {
        self.write_field(API_KEY_ENTRY, credentials.api_key.as_deref());
        self.write_field(MODEL_ENTRY, credentials.model.as_deref());
    }

    /// Persist only the model entry (same non-empty policy as [`save`](Self::save)).
    pub fn save_model(&self, model: &str) {
        self.write_field(MODEL_ENTRY, Some(model));
    }

    /// Backing file, for display.
    pub fn location(&self) -> Option<&Path> {
        self.store.location()
    }

    fn write_field(&self, entry: &str, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if let Err(e) = self.store.set(entry, value) {
            warn!("Failed to persist {}: {}", entry, e);
        }
    }
}
