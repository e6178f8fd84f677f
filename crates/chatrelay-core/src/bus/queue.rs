//! Event bus backed by an unbounded tokio mpsc channel.
//!
//! Publishing never blocks and never fails: if the front-end has gone away,
//! events are dropped.

use super::types::ChatEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Channel carrying [`ChatEvent`]s from the engine to the front-end.
pub struct EventBus {
    tx: mpsc::UnboundedSender<ChatEvent>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ChatEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        EventBus {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Publish an event.
    pub fn publish(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver closed, dropping event");
        }
    }

    /// Take every event published so far without waiting.
    pub async fn drain(&self) -> Vec<ChatEvent> {
        let mut rx = self.rx.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[tokio::test]
    async fn test_publish_then_drain() {
        let bus = EventBus::new();
        bus.publish(ChatEvent::NeedCredential);
        assert_eq!(bus.drain().await, vec![ChatEvent::NeedCredential]);
    }

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let bus = EventBus::new();
        bus.publish(ChatEvent::TurnAppended {
            role: Role::User,
            text: "a".into(),
        });
        bus.publish(ChatEvent::Completed { ok: true });

        let events = bus.drain().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ChatEvent::Completed { ok: true });
        assert!(bus.drain().await.is_empty());
    }
}
