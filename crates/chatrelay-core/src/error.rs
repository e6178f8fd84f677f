//! Error taxonomy shared by every Chatrelay component.
//!
//! The resolver and the generation client return these errors unchanged; the
//! conversation orchestrator is the single place that turns them into visible
//! transcript entries.

use thiserror::Error;

/// Errors produced by the conversation engine and its collaborators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// No API key is configured for this session.
    #[error("Missing API key")]
    MissingCredential,

    /// The provider rejected the request, or the exchange failed in transport
    /// or decoding. `message` is surfaced to the user verbatim.
    #[error("{message}")]
    Upstream {
        /// HTTP status, when the provider answered at all.
        status: Option<u16>,
        message: String,
    },

    /// The catalog lists no generation-capable model for this credential.
    #[error("No usable model is available for this API key")]
    NoUsableModel,

    /// The request did not complete within the configured bound.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Another request is already in flight for this session.
    #[error("A request is already in progress")]
    Busy,

    /// Invalid configuration (e.g. an unparseable API base URL).
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// Build an upstream error that carries an HTTP status.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        ChatError::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Build an upstream error for a transport or decoding failure.
    pub fn transport(message: impl Into<String>) -> Self {
        ChatError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the provider refused the API key itself.
    ///
    /// Gemini answers an invalid key with 400 `API_KEY_INVALID` and a message
    /// naming the key, and a key without access with 401/403.
    pub fn is_credential_rejection(&self) -> bool {
        match self {
            ChatError::MissingCredential => true,
            ChatError::Upstream {
                status: Some(status),
                message,
            } => {
                matches!(status, 401 | 403)
                    || (*status == 400 && message.to_lowercase().contains("api key"))
            }
            _ => false,
        }
    }

    /// Whether the provider reported the addressed model as unknown.
    pub fn is_model_not_found(&self) -> bool {
        matches!(
            self,
            ChatError::Upstream {
                status: Some(404),
                ..
            }
        )
    }
}
