//! Core types for Chatrelay: conversation turns, catalog descriptors, and the
//! Generative Language wire format.
//!
//! Every field of a provider response is optional here: the provider may omit
//! any level of nesting, and decoding must never fail on a missing field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Capability a catalog entry must advertise to be usable for chat.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Prefix the catalog puts in front of every model name.
pub const MODEL_NAME_PREFIX: &str = "models/";

/// Strip the catalog's `models/` prefix from a model name, if present.
pub fn strip_model_prefix(name: &str) -> &str {
    name.strip_prefix(MODEL_NAME_PREFIX).unwrap_or(name)
}

// ─────────────────────────────────────────────
// Conversation turns
// ─────────────────────────────────────────────

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name in the provider's vocabulary (`"user"` / `"model"`).
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message of the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Turn {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Model catalog
// ─────────────────────────────────────────────

/// A model as reported by the provider's catalog endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Full catalog name, e.g. `"models/gemini-2.5-flash"`.
    pub name: String,
    /// Operations the model supports, e.g. `{"generateContent", "countTokens"}`.
    pub supported_operations: BTreeSet<String>,
}

impl ModelDescriptor {
    pub fn new<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModelDescriptor {
            name: name.into(),
            supported_operations: operations.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the model can serve chat generation.
    pub fn is_usable(&self) -> bool {
        self.supported_operations.contains(GENERATE_CONTENT)
    }

    /// Name without the `models/` prefix, as used in generation URLs.
    pub fn short_name(&self) -> &str {
        strip_model_prefix(&self.name)
    }
}

/// `GET /models` response body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListModelsResponse {
    pub models: Option<Vec<ModelEntry>>,
    pub next_page_token: Option<String>,
}

/// One entry of the catalog listing.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelEntry {
    pub name: Option<String>,
    pub supported_generation_methods: Option<Vec<String>>,
}

impl ListModelsResponse {
    /// Convert the listing into descriptors, dropping entries without a name.
    pub fn into_descriptors(self) -> Vec<ModelDescriptor> {
        self.models
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name?;
                Some(ModelDescriptor::new(
                    name,
                    entry.supported_generation_methods.unwrap_or_default(),
                ))
            })
            .collect()
    }
}

// ─────────────────────────────────────────────
// Generation request
// ─────────────────────────────────────────────

/// `POST /models/{model}:generateContent` request body.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
}

/// A role-tagged list of parts.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// A single-part text content.
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Content {
            role: role.into(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A text part of a request content.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Part {
    pub text: String,
}

// ─────────────────────────────────────────────
// Generation response
// ─────────────────────────────────────────────

/// `generateContent` response body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidateContent {
    pub parts: Option<Vec<ResponsePart>>,
}

/// A response part; non-text parts decode with `text: None`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate, in order, every text fragment of the first candidate.
    ///
    /// Returns `None` when there is no candidate, content, or text.
    pub fn first_candidate_text(&self) -> Option<String> {
        let parts = self
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ─────────────────────────────────────────────
// Provider errors
// ─────────────────────────────────────────────

/// Structured error body: `{"error": {"code": 400, "message": "...", "status": "..."}}`.
/// Only `message` is read; the other fields are ignored on decode.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// The provider's human-readable message, if it sent a non-empty one.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_ref()?
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
