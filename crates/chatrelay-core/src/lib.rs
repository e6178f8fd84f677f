//! Chatrelay core: the data model shared by the engine, providers, and CLI.
//!
//! - [`types`]: turns, catalog descriptors, Generative Language wire types
//! - [`transcript`]: the append-only transcript store
//! - [`session`]: session state and the credential cache
//! - [`bus`]: events published to the front-end
//! - [`config`]: schema, loading, env overrides
//! - [`error`]: the [`ChatError`] taxonomy

pub mod bus;
pub mod config;
pub mod error;
pub mod session;
pub mod transcript;
pub mod types;
pub mod utils;

pub use error::ChatError;
pub use transcript::Transcript;
pub use types::{ModelDescriptor, Role, Turn};
