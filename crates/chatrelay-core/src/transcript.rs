//! Transcript store: the append-only, ordered history of a conversation.
//!
//! Order is semantically meaningful: the whole transcript is replayed as
//! history on every generation request. There is no way to edit or remove a
//! turn; a mistake is corrected by appending another turn.

use crate::types::Turn;

/// Append-only sequence of turns.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Read-only view of every turn in append order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_snapshot_last() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::user("hi"));
        assert_eq!(transcript.snapshot().last(), Some(&Turn::user("hi")));
    }

    #[test]
    fn test_order_is_append_order() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::assistant("Welcome"));
        transcript.append(Turn::user("one"));
        transcript.append(Turn::assistant("two"));

        let texts: Vec<&str> = transcript.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Welcome", "one", "two"]);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
        assert!(transcript.snapshot().is_empty());
    }
}
