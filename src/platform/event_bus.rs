use crate::domains::core::events::EventEnvelope;
use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// An event delivered to bus subscribers.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub topic: String,
    pub envelope: EventEnvelope,
}

/// Internal subscribers invoked synchronously on every publish, ahead
/// of the broadcast fan-out. The read-model index registers here so
/// the core's own projections observe publishes deterministically.
pub trait EventObserver: Send + Sync {
    fn observe(&self, topic: &str, envelope: &EventEnvelope);
}

/// At-least-once topic publish of domain events. No acknowledgement;
/// delivery to external subscribers is best-effort ordered per
/// publisher.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> DomainResult<()>;

    /// Subscribe to the broadcast stream. Slow subscribers may observe
    /// lagged-receiver errors; the stream is advisory.
    fn subscribe(&self) -> broadcast::Receiver<PublishedEvent>;
}

/// In-process event bus over a tokio broadcast channel.
pub struct InProcessEventBus {
    sender: broadcast::Sender<PublishedEvent>,
    observers: Vec<std::sync::Arc<dyn EventObserver>>,
}

impl InProcessEventBus {
    pub fn new(capacity: usize, observers: Vec<std::sync::Arc<dyn EventObserver>>) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, observers }
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> DomainResult<()> {
        // Serialization failures here would poison every subscriber;
        // surface them as a dependency failure before fan-out.
        serde_json::to_string(&envelope)
            .map_err(|e| DomainError::DependencyFailure(format!("event serialization: {}", e)))?;

        for observer in &self.observers {
            observer.observe(topic, &envelope);
        }

        let tag = envelope.event.tag();
        // A send error only means there are no external subscribers.
        let _ = self.sender.send(PublishedEvent {
            topic: topic.to_string(),
            envelope,
        });
        log::debug!("published {} to topic {}", tag, topic);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::core::events::GraceEvent;
    use crate::domains::owner::types::OwnerEvent;
    use crate::types::EventMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    struct CountingObserver(AtomicUsize);

    impl EventObserver for CountingObserver {
        fn observe(&self, _topic: &str, _envelope: &EventEnvelope) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope::new(
            GraceEvent::OwnerEvent(OwnerEvent::LogicalDeleted {
                delete_reason: "retire".into(),
            }),
            Uuid::new_v4(),
            EventMetadata::new("c-1"),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_and_observers() {
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let bus = InProcessEventBus::new(16, vec![observer.clone()]);
        let mut receiver = bus.subscribe();

        bus.publish("graceevents", sample_envelope()).await.unwrap();

        let delivered = receiver.recv().await.unwrap();
        assert_eq!(delivered.topic, "graceevents");
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InProcessEventBus::new(16, Vec::new());
        assert!(bus.publish("graceevents", sample_envelope()).await.is_ok());
    }

    #[tokio::test]
    async fn test_envelope_serializes_with_stable_tag() {
        let envelope = sample_envelope();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["tag"], "OwnerEvent");
        assert_eq!(json["event"]["type"], "LogicalDeleted");
        assert_eq!(json["metadata"]["correlation_id"], "c-1");
    }
}
