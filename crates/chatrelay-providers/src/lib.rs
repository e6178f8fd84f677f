//! Provider layer for Chatrelay.
//!
//! # Architecture
//!
//! - [`traits::GenerativeBackend`]: trait the conversation engine talks to
//! - [`gemini::GeminiClient`]: Generative Language REST client (catalog + generation)
//! - [`resolver::ModelResolver`]: catalog-backed model selection and validation

pub mod gemini;
pub mod resolver;
pub mod traits;

// Re-export main types for convenience
pub use gemini::{build_request, GeminiClient, EMPTY_REPLY};
pub use resolver::{ModelPolicy, ModelResolver};
pub use traits::GenerativeBackend;
