//! Event types for the HWO event system
//!
//! Provides shared event definitions and the EventBus used to fan events
//! out to SSE subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::instrument::InstrumentParams;

/// HWO service events
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HwoEvent {
    /// A client published a new instrument parameter set
    ///
    /// Triggers:
    /// - SSE: live observability counters recompute
    ParamsPublished {
        /// Parameter set now in effect
        params: InstrumentParams,
        /// Reference targets observable under `params` at the default threshold
        observable_count: usize,
        /// Size of the reference catalogue
        catalog_size: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new model snapshot was installed
    ModelsReloaded {
        /// Artifact version from model metadata (None in fallback mode)
        version: Option<String>,
        /// True when no model artifacts are loaded
        degraded: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A batch scoring request finished
    BatchCompleted {
        batch_id: Uuid,
        total: usize,
        successful: usize,
        failed: usize,
        degraded_mode: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl HwoEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            HwoEvent::ParamsPublished { .. } => "ParamsPublished",
            HwoEvent::ModelsReloaded { .. } => "ModelsReloaded",
            HwoEvent::BatchCompleted { .. } => "BatchCompleted",
        }
    }
}

/// Broadcast bus for [`HwoEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HwoEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<HwoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: HwoEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_event() -> HwoEvent {
        HwoEvent::BatchCompleted {
            batch_id: Uuid::new_v4(),
            total: 3,
            successful: 2,
            failed: 1,
            degraded_mode: false,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(batch_event()).unwrap();
        assert_eq!(json["type"], "BatchCompleted");
        assert_eq!(json["failed"], 1);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(10);
        bus.emit_lossy(batch_event());
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(HwoEvent::ModelsReloaded {
            version: Some("v2".to_string()),
            degraded: false,
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "ModelsReloaded");
    }
}
