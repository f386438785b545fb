use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Event Trait
// ============================================================================

/// A fact that already happened, serializable for the broker.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    /// Constant tag carried on the wire.
    fn event_type() -> &'static str
    where
        Self: Sized;

    fn event_version() -> i32
    where
        Self: Sized,
    {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc>;
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(event)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(payload: &[u8]) -> serde_json::Result<E> {
    serde_json::from_slice(payload)
}
