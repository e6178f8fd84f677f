//! Event bus: how the conversation engine talks back to the presentation layer.

pub mod queue;
pub mod types;

pub use queue::EventBus;
pub use types::ChatEvent;
