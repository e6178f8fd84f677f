//! Chatrelay Engine: the conversation orchestrator.
//!
//! [`Conversation`] sequences one exchange: record the user turn, make sure a
//! credential and a model are available, call the backend, and record the
//! reply (or the failure) as an assistant turn. Progress is reported through
//! the [`EventBus`](chatrelay_core::bus::EventBus).

pub mod conversation;

pub use conversation::{Conversation, TurnOutcome, ERROR_PREFIX};
