// --- File: crates/connectify_channel/src/events.rs ---
//! Typed registrar lifecycle events.
//!
//! Observers call [`EventBus::subscribe`] and unsubscribe by dropping the
//! receiver. Emitting with no subscribers is not an error.

use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast buffer. Slow receivers see `Lagged` once it fills.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The backend answered an update with 409
    Conflict,
    /// The stored device ID no longer matches this device
    AppRestore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrarEvent {
    ChannelCreated { channel_id: String, existing: bool },
    RegistrationSucceeded { channel_id: String },
    RegistrationFailed { status: u16 },
    ChannelInvalidated { reason: InvalidationReason },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RegistrarEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistrarEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: RegistrarEvent) {
        if self.tx.send(event).is_err() {
            trace!("No registrar event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
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

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(RegistrarEvent::ChannelCreated {
            channel_id: "abc123".to_string(),
            existing: false,
        });
        bus.emit(RegistrarEvent::RegistrationFailed { status: 400 });

        assert_eq!(
            rx.recv().await.unwrap(),
            RegistrarEvent::ChannelCreated {
                channel_id: "abc123".to_string(),
                existing: false
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistrarEvent::RegistrationFailed { status: 400 }
        );
    }

    #[test]
    fn test_emit_without_subscribers_and_unsubscribe() {
        let bus = EventBus::new();
        bus.emit(RegistrarEvent::ChannelInvalidated {
            reason: InvalidationReason::Conflict,
        });

        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
