//! HTTP client for the Generative Language (Gemini) REST API.
//!
//! Two endpoints are used:
//! - `GET  {api_base}/models?key=KEY[&pageToken=T]`: the model catalog
//! - `POST {api_base}/models/{model}:generateContent?key=KEY`: one chat turn
//!
//! Every request is bounded by the configured timeout; an elapsed timeout
//! surfaces as [`ChatError::Timeout`], everything else as
//! [`ChatError::Upstream`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::{debug, error, warn};

use chatrelay_core::config::ProviderSettings;
use chatrelay_core::types::{
    strip_model_prefix, Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse,
    ListModelsResponse,
};
use chatrelay_core::{ChatError, ModelDescriptor, Turn};

use crate::traits::GenerativeBackend;

/// Reply text used when the provider answers successfully but without text.
pub const EMPTY_REPLY: &str = "(empty)";

// ─────────────────────────────────────────────
// GeminiClient
// ─────────────────────────────────────────────

/// Talks to the Generative Language API over HTTPS via `reqwest`.
pub struct GeminiClient {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://generativelanguage.googleapis.com/v1beta"`).
    api_base: Url,
    /// Per-request timeout.
    timeout: Duration,
    /// Upper bound on catalog pages followed.
    max_catalog_pages: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client from provider settings.
    ///
    /// Fails with [`ChatError::Config`] if the API base is not a valid base URL.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ChatError> {
        let api_base = Url::parse(settings.api_base.trim())
            .map_err(|e| ChatError::Config(format!("invalid API base {:?}: {e}", settings.api_base)))?;
        if api_base.cannot_be_a_base() {
            return Err(ChatError::Config(format!(
                "API base {:?} cannot be used as a base URL",
                settings.api_base
            )));
        }

        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(GeminiClient {
            client,
            api_base,
            timeout,
            max_catalog_pages: settings.max_catalog_pages.max(1),
        })
    }

    /// `{api_base}/models`
    fn models_url(&self) -> Url {
        self.endpoint(&["models"])
    }

    /// `{api_base}/models/{model}:generateContent`
    fn generate_url(&self, model: &str) -> Url {
        let action = format!("{}:generateContent", strip_model_prefix(model));
        self.endpoint(&["models", &action])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Map a `reqwest` failure to the engine's taxonomy.
    fn transport_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            // Strip the URL: it carries the API key as a query parameter.
            ChatError::transport(format!("Request failed: {}", e.without_url()))
        }
    }

    /// Fetch one catalog page.
    async fn fetch_catalog_page(
        &self,
        api_key: &str,
        page_token: Option<&str>,
    ) -> Result<ListModelsResponse, ChatError> {
        let mut request = self
            .client
            .get(self.models_url())
            .query(&[("key", api_key)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "catalog request failed");
            self.transport_error(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "catalog query rejected");
            return Err(ChatError::upstream(
                status.as_u16(),
                structured_message(&body).unwrap_or_else(|| status_text(status)),
            ));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "failed to parse catalog response");
            ChatError::transport(format!("Malformed model catalog: {e}"))
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, ChatError> {
        let mut descriptors = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..self.max_catalog_pages {
            let response = self
                .fetch_catalog_page(api_key, page_token.as_deref())
                .await?;
            let next = response.next_page_token.clone().filter(|t| !t.is_empty());
            descriptors.extend(response.into_descriptors());

            match next {
                Some(token) if page_token.as_deref() != Some(token.as_str()) => {
                    page_token = Some(token);
                }
                _ => break,
            }

            if page + 1 == self.max_catalog_pages {
                warn!(pages = self.max_catalog_pages, "catalog page limit reached");
            }
        }

        debug!(models = descriptors.len(), "catalog fetched");
        Ok(descriptors)
    }

    async fn generate(
        &self,
        turns: &[Turn],
        system_prompt: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String, ChatError> {
        let body = build_request(turns, system_prompt);

        debug!(model = %model, turns = turns.len(), "calling generateContent");

        let response = self
            .client
            .post(self.generate_url(model))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "generation request failed");
                self.transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, model = %model, "generation rejected");
            return Err(ChatError::upstream(
                status.as_u16(),
                generation_error_message(status, &body),
            ));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "failed to parse generation response");
            ChatError::transport(format!("Malformed generation response: {e}"))
        })?;

        let text = parsed
            .first_candidate_text()
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        debug!(chars = text.len(), "generation received");
        Ok(text)
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }
}

// ─────────────────────────────────────────────
// Wire helpers
// ─────────────────────────────────────────────

/// Serialize the transcript and system prompt into a request body.
///
/// `contents[i]` is always built from `turns[i]`: the provider sees the
/// history in exactly the order it was appended.
pub fn build_request(turns: &[Turn], system_prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content::text("system", system_prompt),
        contents: turns
            .iter()
            .map(|turn| Content::text(turn.role.wire_name(), turn.text.as_str()))
            .collect(),
    }
}

/// The provider's `error.message`, if the body carries one.
fn structured_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .message()
        .map(String::from)
}

/// Message for a rejected generation: structured message, else the decoded
/// JSON body, else the bare status code.
fn generation_error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = structured_message(body) {
        return message;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if !value.is_null() => value.to_string(),
        _ => status_text(status),
    }
}

fn status_text(status: StatusCode) -> String {
    status.as_u16().to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
