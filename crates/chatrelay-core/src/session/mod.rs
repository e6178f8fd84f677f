//! Session state and the credential cache.
//!
//! The transcript and the persisted credentials have different lifetimes and
//! are kept as separate owned structures:
//! - [`Session`]: in-memory, lives for the process.
//! - [`CredentialCache`]: `{key, model}` written through a [`KeyValueStore`]
//!   on every change.

pub mod credentials;
pub mod state;
pub mod store;

pub use credentials::{CredentialCache, Credentials};
pub use state::Session;
pub use store::{FileStore, KeyValueStore, MemoryStore};
