use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    message::{Header, Headers, Message, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use uuid::Uuid;

use super::broker::{BrokerError, Delivery, MessageBroker, OutboundMessage, QueueSource};
use super::topology::{QueueSpec, Topology};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

// ============================================================================
// Redpanda Broker - topic exchange emulated over Kafka topics
// ============================================================================
//
// Kafka has no exchanges, so routing happens here: the routing key is matched
// against the topology and one record is produced per matching queue, on a
// topic named after the queue. The record key carries the routing key and
// the record timestamp the publish time (queue TTL is checked on delivery).
//
// ============================================================================

const MESSAGE_ID_HEADER: &str = "message-id";

pub struct RedpandaBroker {
    producer: FutureProducer,
    topology: Arc<Topology>,
    circuit_breaker: CircuitBreaker,
    send_timeout: Duration,
}

impl RedpandaBroker {
    pub fn new(brokers: &str, topology: Topology, send_timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()?;

        Ok(Self {
            producer,
            topology: Arc::new(topology),
            circuit_breaker: CircuitBreaker::new("redpanda", CircuitBreakerConfig::default()),
            send_timeout,
        })
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        self.circuit_breaker.clone()
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }

    async fn produce(&self, topic: &str, message: &OutboundMessage) -> Result<(), BrokerError> {
        let message_id = message.message_id.to_string();
        let record = FutureRecord::to(topic)
            .key(message.routing_key.as_str())
            .payload(message.payload.as_slice())
            .timestamp(message.published_at.timestamp_millis())
            .headers(OwnedHeaders::new().insert(Header {
                key: MESSAGE_ID_HEADER,
                value: Some(message_id.as_str()),
            }));

        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| BrokerError::Send(e.to_string()))
    }
}

#[async_trait]
impl MessageBroker for RedpandaBroker {
    async fn send(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        if message.exchange != self.topology.exchange {
            return Err(BrokerError::UnknownExchange(message.exchange));
        }

        let routes = self.topology.route(&message.routing_key);
        let mut undelivered = Vec::new();
        let mut circuit_open = false;

        for queue in &routes {
            let result = self
                .circuit_breaker
                .call(self.produce(&queue.name, &message))
                .await;

            match result {
                Ok(()) => {
                    tracing::debug!(
                        topic = %queue.name,
                        routing_key = %message.routing_key,
                        "Published to Redpanda"
                    );
                }
                Err(CircuitBreakerError::CircuitOpen) => {
                    tracing::error!(topic = %queue.name, "Circuit breaker open - Redpanda unavailable");
                    circuit_open = true;
                    undelivered.push(queue.name.clone());
                }
                Err(CircuitBreakerError::OperationFailed(e)) => {
                    tracing::error!(topic = %queue.name, error = %e, "Failed to publish to Redpanda");
                    undelivered.push(queue.name.clone());
                }
            }
        }

        match undelivered.len() {
            0 => Ok(()),
            n if circuit_open && n == routes.len() => Err(BrokerError::CircuitOpen),
            _ => Err(BrokerError::Undelivered(undelivered)),
        }
    }
}

// ============================================================================
// Redpanda Queue Source
// ============================================================================

pub struct RedpandaQueueSource {
    consumer: StreamConsumer,
    spec: QueueSpec,
}

impl RedpandaQueueSource {
    /// Each queue consumes in its own group so the three roles never share offsets.
    pub fn new(brokers: &str, group_prefix: &str, spec: QueueSpec) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", format!("{}.{}", group_prefix, spec.name))
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[spec.name.as_str()])?;

        Ok(Self { consumer, spec })
    }
}

#[async_trait]
impl QueueSource for RedpandaQueueSource {
    async fn next_delivery(&mut self) -> Option<Result<Delivery, BrokerError>> {
        let result = match self.consumer.recv().await {
            Ok(msg) => {
                let message_id = msg
                    .headers()
                    .and_then(|headers| {
                        headers
                            .iter()
                            .find(|h| h.key == MESSAGE_ID_HEADER)
                            .and_then(|h| h.value)
                            .and_then(|v| std::str::from_utf8(v).ok())
                            .and_then(|s| Uuid::parse_str(s).ok())
                    })
                    .unwrap_or_else(Uuid::now_v7);

                let published_at = msg
                    .timestamp()
                    .to_millis()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .unwrap_or_else(Utc::now);

                Ok(Delivery {
                    message_id,
                    queue: self.spec.name.clone(),
                    routing_key: msg
                        .key()
                        .map(|k| String::from_utf8_lossy(k).into_owned())
                        .unwrap_or_default(),
                    payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                    published_at,
                    message_ttl: self.spec.message_ttl,
                })
            }
            Err(e) => Err(BrokerError::Unavailable(e.to_string())),
        };
        Some(result)
    }

    fn queue_name(&self) -> &str {
        &self.spec.name
    }
}
