//! Session-scoped key-value stores backing the credential cache.
//!
//! File format: one pretty-printed JSON object per session in
//! `~/.chatrelay/sessions/{safe_id}.json`, e.g.
//! `{"GEMINI_API_KEY": "...", "GEMINI_MODEL": "gemini-2.5-flash"}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

/// A string key-value store scoped to one conversation session.
///
/// Reads never fail; a missing or unreadable entry is simply absent.
pub trait KeyValueStore: Send + Sync {
    /// Read an entry.
    fn get(&self, key: &str) -> Option<String>;

    /// Write an entry.
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;

    /// Backing file, for stores that have one.
    fn location(&self) -> Option<&Path> {
        None
    }
}

// ─────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────
// FileStore
// ─────────────────────────────────────────────

/// Store backed by a JSON file, rewritten on every change.
///
/// Thread-safe via `RwLock`: multiple readers, exclusive writer.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// The parent directory is created if it doesn't exist. An unreadable or
    /// malformed file is treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = load_entries(&path);
        debug!(
            "Opened session store {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(FileStore {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn save_to_disk(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        debug!("Saved session store to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.save_to_disk(&entries)
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        return BTreeMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read session store {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to parse session store {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
