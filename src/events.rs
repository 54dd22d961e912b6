//! Usage events for privileged-feature accounting.
//!
//! Every write that exercises a privileged feature emits one
//! [`UsageEvent`] naming the credential's public id and the single most
//! significant feature used. Events flow through a bounded channel; a
//! full queue drops the event with a warning rather than stalling the
//! write path. Delivery is best effort and consumers must treat the
//! stream as lossy.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use uuid::Uuid;

use crate::telemetry;

/// The privileged feature a write exercised.
///
/// When several apply, the most significant one wins:
/// persistence > custom key length > custom key > large body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageReason {
    /// Eternal storage (zero TTL) or a TTL above the anonymous maximum.
    PersistentKey,
    /// A generated-key length below the anonymous minimum.
    CustomKeyLength,
    /// A caller-chosen key name.
    CustomKey,
    /// A body above the anonymous size limit.
    LargeBody,
}

/// One privileged write, attributed to a credential.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    /// Public id of the credential; never the secret token.
    pub api_key_id: Uuid,
    pub reason: UsageReason,
    pub source_ip: String,
}

impl UsageEvent {
    pub fn new(api_key_id: Uuid, reason: UsageReason, source_ip: impl Into<String>) -> Self {
        Self {
            api_key_id,
            reason,
            source_ip: source_ip.into(),
        }
    }
}

/// Non-blocking sender side of the usage-event queue.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<UsageEvent>,
}

impl EventPublisher {
    /// Create a bounded queue, returning the publisher and the consumer
    /// stream.
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<UsageEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, ReceiverStream::new(rx))
    }

    /// Enqueue an event without blocking.
    ///
    /// A full queue (or a dropped consumer) loses the event.
    pub fn notify(&self, event: UsageEvent) {
        if let Err(rejected) = self.tx.try_send(event) {
            let event = rejected.into_inner();
            metrics::counter!(telemetry::USAGE_EVENTS_DROPPED_TOTAL).increment(1);
            warn!(
                api_key_id = %event.api_key_id,
                reason = ?event.reason,
                "usage event dropped, queue full or consumer gone"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn events_reach_the_consumer() {
        let (publisher, mut stream) = EventPublisher::channel(8);
        let id = Uuid::new_v4();
        publisher.notify(UsageEvent::new(id, UsageReason::CustomKey, "192.0.2.1"));

        let event = stream.next().await.unwrap();
        assert_eq!(event.api_key_id, id);
        assert_eq!(event.reason, UsageReason::CustomKey);
        assert_eq!(event.source_ip, "192.0.2.1");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (publisher, mut stream) = EventPublisher::channel(1);
        let id = Uuid::new_v4();
        publisher.notify(UsageEvent::new(id, UsageReason::LargeBody, "a"));
        // Queue is full; this one is dropped silently.
        publisher.notify(UsageEvent::new(id, UsageReason::PersistentKey, "b"));

        let first = stream.next().await.unwrap();
        assert_eq!(first.reason, UsageReason::LargeBody);
        drop(publisher);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn reasons_serialize_snake_case() {
        let json = serde_json::to_string(&UsageReason::CustomKeyLength).unwrap();
        assert_eq!(json, "\"custom_key_length\"");
    }
}
