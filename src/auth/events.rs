use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionChange {
    SignedIn,
    SignedOut,
}

/// Broadcast payload emitted whenever a session is opened or revoked.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub change: SessionChange,
}

/// In-process session-change feed. Subscribers get one event per change;
/// dropping the receiver ends the subscription.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Send with no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_sees_one_event_per_change() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();

        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        events.publish(SessionEvent {
            user_id,
            session_id,
            change: SessionChange::SignedIn,
        });
        events.publish(SessionEvent {
            user_id,
            session_id,
            change: SessionChange::SignedOut,
        });

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.change, SessionChange::SignedIn);
        assert_eq!(first.user_id, user_id);

        let second = rx.recv().await.expect("second event");
        assert_eq!(second.change, SessionChange::SignedOut);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let events = SessionEvents::new();
        events.publish(SessionEvent {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            change: SessionChange::SignedOut,
        });
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_subscription() {
        let events = SessionEvents::new();
        let rx = events.subscribe();
        drop(rx);
        // no live receivers again
        events.publish(SessionEvent {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            change: SessionChange::SignedIn,
        });
    }
}
