// Live notification sink: fire-and-forget publish of push events to WebSocket subscribers.

use tokio::sync::broadcast;

use crate::models::{Envelope, LiveEvent};

/// Publish primitive consumed by the service and the refresh worker.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, topic: &'static str, event: LiveEvent);
}

/// Fans envelopes out over a tokio broadcast channel; each /ws/metrics client subscribes.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, topic: &'static str, event: LiveEvent) {
        let envelope = Envelope { event: topic, data: event };
        if self.tx.send(envelope).is_err() {
            tracing::debug!(
                operation = "publish",
                topic,
                "No live subscribers; event dropped"
            );
        }
    }
}
