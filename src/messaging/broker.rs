use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// Broker Port - what the publisher and consumers need from a broker
// ============================================================================
//
// Only topic/routing semantics are modelled. Implementations:
// - InMemoryTopicBroker (in-process exchange)
// - RedpandaBroker (exchange emulated over one topic per queue)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Circuit breaker open for broker")]
    CircuitOpen,

    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Queue already has a consumer: {0}")]
    AlreadySubscribed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Send failed: {0}")]
    Send(String),

    /// Routing reached every matching queue, but these ones did not take the message.
    #[error("Not delivered to queues: {}", .0.join(", "))]
    Undelivered(Vec<String>),
}

/// One message as handed to the exchange.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub message_id: Uuid,
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            payload,
            published_at: Utc::now(),
        }
    }
}

/// One message as seen by a queue consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: Uuid,
    pub queue: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
    pub message_ttl: Duration,
}

impl Delivery {
    /// A message not consumed within its queue's TTL is dead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.message_ttl) {
            Ok(ttl) => now - self.published_at > ttl,
            Err(_) => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Hand one message to the exchange. Routing to queues is the broker's job.
    async fn send(&self, message: OutboundMessage) -> Result<(), BrokerError>;
}

/// Pull side of a single queue.
#[async_trait]
pub trait QueueSource: Send {
    /// `None` once the queue is closed.
    async fn next_delivery(&mut self) -> Option<Result<Delivery, BrokerError>>;

    fn queue_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(published_at: DateTime<Utc>, ttl: Duration) -> Delivery {
        Delivery {
            message_id: Uuid::now_v7(),
            queue: "q".to_string(),
            routing_key: "course.completed".to_string(),
            payload: Vec::new(),
            published_at,
            message_ttl: ttl,
        }
    }

    #[test]
    fn test_delivery_expiry() {
        let now = Utc::now();
        let ttl = Duration::from_secs(3600);

        assert!(!delivery(now - chrono::Duration::minutes(59), ttl).is_expired_at(now));
        assert!(delivery(now - chrono::Duration::minutes(61), ttl).is_expired_at(now));
    }

    #[test]
    fn test_outbound_message_ids_are_unique() {
        let a = OutboundMessage::new("x", "k", vec![1]);
        let b = OutboundMessage::new("x", "k", vec![1]);
        assert_ne!(a.message_id, b.message_id);
    }
}
