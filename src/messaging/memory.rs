use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::broker::{BrokerError, Delivery, MessageBroker, OutboundMessage, QueueSource};
use super::topology::{QueueSpec, Topology};

// ============================================================================
// In-Memory Topic Exchange
// ============================================================================
//
// Routes each message to every queue whose binding pattern matches the
// routing key, in topology order. Each queue is an unbounded channel with a
// single consumer. Messages matching no binding are dropped, as a topic
// exchange would. A closed queue does not stop routing to the others.
//
// ============================================================================

struct QueueChannel {
    spec: QueueSpec,
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

#[derive(Clone)]
pub struct InMemoryTopicBroker {
    topology: Arc<Topology>,
    queues: Arc<Mutex<Vec<QueueChannel>>>,
}

impl InMemoryTopicBroker {
    pub fn new(topology: Topology) -> Self {
        let queues = topology
            .queues()
            .into_iter()
            .map(|spec| {
                let (sender, receiver) = mpsc::unbounded_channel();
                QueueChannel {
                    spec: spec.clone(),
                    sender,
                    receiver: Some(receiver),
                }
            })
            .collect();

        Self {
            topology: Arc::new(topology),
            queues: Arc::new(Mutex::new(queues)),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Attach the single consumer of `queue`.
    pub fn subscribe(&self, queue: &str) -> Result<MemoryQueueSource, BrokerError> {
        let mut queues = self.queues.lock();
        let channel = queues
            .iter_mut()
            .find(|c| c.spec.name == queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_string()))?;

        let receiver = channel
            .receiver
            .take()
            .ok_or_else(|| BrokerError::AlreadySubscribed(queue.to_string()))?;

        tracing::debug!(queue = %queue, pattern = %channel.spec.binding_pattern, "Consumer subscribed");

        Ok(MemoryQueueSource {
            queue: queue.to_string(),
            receiver,
        })
    }
}

#[async_trait]
impl MessageBroker for InMemoryTopicBroker {
    async fn send(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        if message.exchange != self.topology.exchange {
            return Err(BrokerError::UnknownExchange(message.exchange));
        }

        let queues = self.queues.lock();
        let mut routed = 0usize;
        let mut undelivered = Vec::new();

        for channel in queues.iter().filter(|c| c.spec.accepts(&message.routing_key)) {
            let delivery = Delivery {
                message_id: message.message_id,
                queue: channel.spec.name.clone(),
                routing_key: message.routing_key.clone(),
                payload: message.payload.clone(),
                published_at: message.published_at,
                message_ttl: channel.spec.message_ttl,
            };

            // A dropped consumer means the queue is gone for this process
            if channel.sender.send(delivery).is_err() {
                tracing::warn!(
                    queue = %channel.spec.name,
                    routing_key = %message.routing_key,
                    "Queue closed, message not delivered"
                );
                undelivered.push(channel.spec.name.clone());
                continue;
            }
            routed += 1;
        }

        tracing::debug!(
            exchange = %message.exchange,
            routing_key = %message.routing_key,
            queues = routed,
            "Message routed"
        );

        if undelivered.is_empty() {
            Ok(())
        } else {
            Err(BrokerError::Undelivered(undelivered))
        }
    }
}

pub struct MemoryQueueSource {
    queue: String,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl QueueSource for MemoryQueueSource {
    async fn next_delivery(&mut self) -> Option<Result<Delivery, BrokerError>> {
        self.receiver.recv().await.map(Ok)
    }

    fn queue_name(&self) -> &str {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::topology::{ROUTING_KEY_ANALYTICS, ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_NOTIFICATION};

    fn message(key: &str) -> OutboundMessage {
        OutboundMessage::new("gamification.events", key, b"{}".to_vec())
    }

    #[tokio::test]
    async fn test_routes_to_matching_queue_only() {
        let broker = InMemoryTopicBroker::new(Topology::default());
        let mut course = broker.subscribe("gamification.course.completed").unwrap();
        let mut notification = broker.subscribe("gamification.notification").unwrap();

        broker.send(message(ROUTING_KEY_NOTIFICATION)).await.unwrap();
        broker.send(message(ROUTING_KEY_COURSE_COMPLETED)).await.unwrap();

        let d = notification.next_delivery().await.unwrap().unwrap();
        assert_eq!(d.routing_key, ROUTING_KEY_NOTIFICATION);
        assert_eq!(d.queue, "gamification.notification");

        let d = course.next_delivery().await.unwrap().unwrap();
        assert_eq!(d.routing_key, ROUTING_KEY_COURSE_COMPLETED);
        assert_eq!(d.message_ttl, std::time::Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_analytics_queue_gets_analytics_key() {
        let broker = InMemoryTopicBroker::new(Topology::default());
        let mut analytics = broker.subscribe("gamification.analytics").unwrap();

        broker.send(message(ROUTING_KEY_ANALYTICS)).await.unwrap();

        let d = analytics.next_delivery().await.unwrap().unwrap();
        assert_eq!(d.payload, b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_unroutable_message_is_dropped() {
        let broker = InMemoryTopicBroker::new(Topology::default());
        assert!(broker.send(message("nobody.listens")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_exchange_rejected() {
        let broker = InMemoryTopicBroker::new(Topology::default());
        let result = broker
            .send(OutboundMessage::new("other", ROUTING_KEY_COURSE_COMPLETED, vec![]))
            .await;
        assert!(matches!(result, Err(BrokerError::UnknownExchange(_))));
    }

    #[tokio::test]
    async fn test_closed_queue_does_not_block_other_bindings() {
        let mut topology = Topology::default();
        topology.analytics.binding_pattern = "#".to_string();
        let broker = InMemoryTopicBroker::new(topology);

        drop(broker.subscribe("gamification.course.completed").unwrap());
        let mut analytics = broker.subscribe("gamification.analytics").unwrap();

        let result = broker.send(message(ROUTING_KEY_COURSE_COMPLETED)).await;

        match result {
            Err(BrokerError::Undelivered(queues)) => {
                assert_eq!(queues, vec!["gamification.course.completed".to_string()]);
            }
            other => panic!("expected Undelivered, got {:?}", other),
        }
        let d = analytics.next_delivery().await.unwrap().unwrap();
        assert_eq!(d.routing_key, ROUTING_KEY_COURSE_COMPLETED);
        assert_eq!(d.queue, "gamification.analytics");
    }

    #[test]
    fn test_single_consumer_per_queue() {
        let broker = InMemoryTopicBroker::new(Topology::default());
        assert!(broker.subscribe("gamification.analytics").is_ok());
        assert!(matches!(
            broker.subscribe("gamification.analytics"),
            Err(BrokerError::AlreadySubscribed(_))
        ));
        assert!(matches!(broker.subscribe("nope"), Err(BrokerError::UnknownQueue(_))));
    }
}
