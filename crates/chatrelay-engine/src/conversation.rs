//! Conversation: sequences user turns through model resolution and generation.
//!
//! One `Conversation` owns one [`Session`]. Mutating calls (`init_session`,
//! `submit_turn`, `set_credential`) are serialized by an in-flight flag; a
//! call that arrives while another is running is rejected with
//! [`ChatError::Busy`] rather than queued.
//!
//! Network calls run against a working copy of the session so the transcript
//! stays readable while a request is outstanding; results are written back
//! under the lock once the call returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use chatrelay_core::bus::{ChatEvent, EventBus};
use chatrelay_core::session::{CredentialCache, Credentials, Session};
use chatrelay_core::types::strip_model_prefix;
use chatrelay_core::{ChatError, Turn};
use chatrelay_providers::{GenerativeBackend, ModelResolver};

/// Prefix of assistant turns that report a failed exchange.
pub const ERROR_PREFIX: &str = "Error: ";

/// Result of a [`Conversation::submit_turn`] call that was accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The backend answered; the reply is now the last turn.
    Replied(String),
    /// The exchange failed; an error turn is now the last turn.
    Failed(ChatError),
}

// ─────────────────────────────────────────────
// In-flight guard
// ─────────────────────────────────────────────

/// Holds the in-flight flag for the duration of one call.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ChatError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| ChatError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ─────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────

/// The conversation orchestrator.
pub struct Conversation {
    /// Generation backend.
    backend: Arc<dyn GenerativeBackend>,
    /// Model selection against the backend's catalog.
    resolver: ModelResolver,
    /// Persisted `{key, model}`.
    cache: CredentialCache,
    /// Outward notifications.
    bus: Arc<EventBus>,
    /// The single session of this process.
    session: Mutex<Session>,
    in_flight: AtomicBool,
}

impl Conversation {
    /// Create a conversation with an empty session.
    ///
    /// Call [`init_session`](Self::init_session) before submitting turns.
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        resolver: ModelResolver,
        cache: CredentialCache,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            backend,
            resolver,
            cache,
            bus,
            session: Mutex::new(Session::new("", Credentials::default())),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Start a fresh session: hydrate credentials from the cache and greet.
    ///
    /// The greeting is recorded verbatim; a blank one adds no turn.
    /// Publishes `NeedCredential` when no API key is stored.
    pub async fn init_session(&self, system_prompt: &str, greeting: &str) -> Result<(), ChatError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let credentials = self.cache.load();
        let has_key = credentials.has_api_key();
        let mut session = Session::new(system_prompt, credentials);

        if !greeting.trim().is_empty() {
            let turn = Turn::assistant(greeting);
            self.bus.publish(ChatEvent::turn(&turn));
            session.transcript.append(turn);
        }

        info!(
            backend = self.backend.display_name(),
            has_key,
            model = session.model().unwrap_or("-"),
            "session initialized"
        );

        *self.session.lock().await = session;

        if !has_key {
            self.bus.publish(ChatEvent::NeedCredential);
        }
        Ok(())
    }

    /// Record a user turn and produce the assistant's reply.
    ///
    /// Failures of the exchange itself are recorded in the transcript and
    /// returned as [`TurnOutcome::Failed`]; `Err` is reserved for calls that
    /// never reached the backend (`Busy`, `MissingCredential`).
    pub async fn submit_turn(&self, text: &str) -> Result<TurnOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let _guard = InFlight::acquire(&self.in_flight)?;

        let mut working = {
            let mut session = self.session.lock().await;
            let turn = Turn::user(text);
            self.bus.publish(ChatEvent::turn(&turn));
            session.transcript.append(turn);

            if session.api_key().is_none() {
                info!("no API key configured, requesting credential");
                self.bus.publish(ChatEvent::NeedCredential);
                self.bus.publish(ChatEvent::Completed { ok: false });
                return Err(ChatError::MissingCredential);
            }
            session.clone()
        };

        let result = self.exchange(&mut working).await;

        let mut session = self.session.lock().await;
        session.credentials = working.credentials;
        session.model_checked_at = working.model_checked_at;

        let outcome = match result {
            Ok(reply) => {
                let turn = Turn::assistant(reply.as_str());
                self.bus.publish(ChatEvent::turn(&turn));
                session.transcript.append(turn);
                self.bus.publish(ChatEvent::Completed { ok: true });
                TurnOutcome::Replied(reply)
            }
            Err(err) => {
                error!(error = %err, "exchange failed");
                let turn = Turn::assistant(format!("{ERROR_PREFIX}{err}"));
                self.bus.publish(ChatEvent::turn(&turn));
                session.transcript.append(turn);

                if err.is_model_not_found() {
                    self.resolver.invalidate(&mut session);
                }
                if err.is_credential_rejection() {
                    self.bus.publish(ChatEvent::NeedCredential);
                }
                self.bus.publish(ChatEvent::Completed { ok: false });
                TurnOutcome::Failed(err)
            }
        };
        Ok(outcome)
    }

    /// Store a new API key (and optionally a requested model), then resolve
    /// the model immediately so the caller learns whether the pair works.
    ///
    /// Returns the model that will be addressed.
    pub async fn set_credential(
        &self,
        api_key: &str,
        requested_model: Option<&str>,
    ) -> Result<String, ChatError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ChatError::MissingCredential);
        }
        let _guard = InFlight::acquire(&self.in_flight)?;

        let mut working = {
            let mut session = self.session.lock().await;
            session.credentials.api_key = Some(api_key.to_string());
            if let Some(model) = requested_model.map(str::trim).filter(|m| !m.is_empty()) {
                session.credentials.model = Some(model.to_string());
            }
            // A different key may see a different catalog.
            session.model_checked_at = None;
            self.cache.save(&session.credentials);
            session.clone()
        };

        let previous = working.model().map(|m| strip_model_prefix(m).to_string());
        let result = self.resolver.ensure_model(&mut working, &self.cache).await;

        let mut session = self.session.lock().await;
        session.credentials = working.credentials;
        session.model_checked_at = working.model_checked_at;

        match result {
            Ok(model) => {
                if previous.as_deref() != Some(model.as_str()) {
                    self.bus.publish(ChatEvent::ModelResolved {
                        model: model.clone(),
                    });
                }
                info!(model = %model, "credential accepted");
                Ok(model)
            }
            Err(err) => {
                warn!(error = %err, "credential stored but model resolution failed");
                Err(err)
            }
        }
    }

    /// Copy of the transcript, oldest first.
    pub async fn transcript(&self) -> Vec<Turn> {
        self.session.lock().await.transcript.snapshot().to_vec()
    }

    pub async fn credentials(&self) -> Credentials {
        self.session.lock().await.credentials.clone()
    }

    /// Resolve the model and generate against the working session.
    async fn exchange(&self, session: &mut Session) -> Result<String, ChatError> {
        let previous = session.model().map(|m| strip_model_prefix(m).to_string());
        let model = self.resolver.ensure_model(session, &self.cache).await?;
        if previous.as_deref() != Some(model.as_str()) {
            self.bus.publish(ChatEvent::ModelResolved {
                model: model.clone(),
            });
        }

        let api_key = session.api_key().ok_or(ChatError::MissingCredential)?;
        debug!(
            model = %model,
            turns = session.transcript.len(),
            "sending transcript"
        );
        self.backend
            .generate(
                session.transcript.snapshot(),
                session.system_prompt(),
                &model,
                api_key,
            )
            .await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
