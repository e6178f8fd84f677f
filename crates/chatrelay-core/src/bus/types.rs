//! Bus event types: notifications flowing from the engine to the front-end.

use crate::types::{Role, Turn};

/// A notification for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// A turn was appended to the transcript; render it.
    TurnAppended { role: Role, text: String },
    /// No usable API key: the front-end should ask for one and call
    /// `set_credential`.
    NeedCredential,
    /// A new model was selected and persisted.
    ModelResolved { model: String },
    /// The in-flight request finished; input may be re-enabled.
    Completed { ok: bool },
}

impl ChatEvent {
    /// Event announcing an appended turn.
    pub fn turn(turn: &Turn) -> Self {
        ChatEvent::TurnAppended {
            role: turn.role,
            text: turn.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_event_copies_turn() {
        let event = ChatEvent::turn(&Turn::user("hi"));
        assert_eq!(
            event,
            ChatEvent::TurnAppended {
                role: Role::User,
                text: "hi".into()
            }
        );
    }
}
