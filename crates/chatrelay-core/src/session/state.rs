//! In-memory session state.

use chrono::{DateTime, Utc};

use super::credentials::Credentials;
use crate::transcript::Transcript;

/// One conversation: credentials, the fixed system prompt, and the transcript.
///
/// Only `credentials` is ever persisted (through the credential cache); the
/// transcript and the validation stamp live for the process only.
#[derive(Clone, Debug)]
pub struct Session {
    pub credentials: Credentials,
    system_prompt: String,
    pub transcript: Transcript,
    /// When `credentials.model` was last confirmed against the catalog.
    pub model_checked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, credentials: Credentials) -> Self {
        Session {
            credentials,
            system_prompt: system_prompt.into(),
            transcript: Transcript::new(),
            model_checked_at: None,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn api_key(&self) -> Option<&str> {
        self.credentials
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self) -> Option<&str> {
        self.credentials
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
    }
}
