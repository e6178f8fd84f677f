//! Backend trait: the seam between the conversation engine and the provider.
//!
//! `GeminiClient` in `gemini.rs` is the production implementation; tests
//! substitute scripted backends.

use async_trait::async_trait;
use chatrelay_core::{ChatError, ModelDescriptor, Turn};

/// A hosted generative-language API.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Fetch the full model catalog visible to `api_key`, in catalog order.
    ///
    /// Returns every entry, usable or not; capability filtering is the
    /// resolver's job.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, ChatError>;

    /// Generate the next assistant reply.
    ///
    /// # Arguments
    /// * `turns`        : Full transcript, replayed in order.
    /// * `system_prompt`: Sent once, outside the turn sequence.
    /// * `model`        : Resolved model name (with or without `models/`).
    /// * `api_key`      : Opaque credential.
    ///
    /// # Returns
    /// The reply text, or `"(empty)"` when the provider produced no text.
    async fn generate(
        &self,
        turns: &[Turn],
        system_prompt: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String, ChatError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
