//! Learning event stream (spec §4.6, §9): pattern lifecycle events fan out
//! to any number of consumers (the Domain Group Learner, metrics,
//! debugging tools) over a bounded broadcast channel so one slow consumer
//! never blocks the learning path.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternEvent {
    Created {
        pattern_id: uuid::Uuid,
        domain: String,
        endpoint: String,
    },
    Used {
        pattern_id: uuid::Uuid,
        domain: String,
        success: bool,
    },
    Transferred {
        source_domain: String,
        target_domain: String,
        reason: String,
        similarity: Option<f64>,
        success: Option<bool>,
    },
    Archived {
        pattern_id: uuid::Uuid,
        domain: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PatternEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PatternEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Slow or absent consumers never block this call;
    /// the channel drops the oldest event instead (spec §5 backpressure:
    /// pattern store writes tolerate bursts).
    pub fn publish(&self, event: PatternEvent) {
        let _ = self.sender.send(event);
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
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(PatternEvent::Created {
            pattern_id: uuid::Uuid::new_v4(),
            domain: "example.com".to_string(),
            endpoint: "/items".to_string(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PatternEvent::Created { .. }));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(PatternEvent::Archived {
            pattern_id: uuid::Uuid::new_v4(),
            domain: "example.com".to_string(),
        });
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(PatternEvent::Used {
            pattern_id: uuid::Uuid::new_v4(),
            domain: "example.com".to_string(),
            success: true,
        });
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
