use std::sync::Arc;

use crate::domain::event::serialize_event;
use crate::domain::learner::CourseCompletedEvent;
use crate::metrics::Metrics;

use super::broker::{MessageBroker, OutboundMessage};
use super::topology::{ROUTING_KEY_ANALYTICS, ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_NOTIFICATION};

// ============================================================================
// Event Publisher - fan-out of course completions onto the topic exchange
// ============================================================================
//
// Destinations are a declared list of (routing key, condition) pairs walked
// in order. Each send stands alone: a failure is logged and counted, the
// next destination is still attempted, and nothing reaches the caller.
// There is no retry and no outbox.
//
// ============================================================================

/// One routing key the publisher may send to, and when.
#[derive(Clone, Copy)]
pub struct Destination {
    pub routing_key: &'static str,
    pub condition: fn(&CourseCompletedEvent) -> bool,
}

fn always(_: &CourseCompletedEvent) -> bool {
    true
}

fn when_passed(event: &CourseCompletedEvent) -> bool {
    event.passed()
}

pub const COURSE_COMPLETED_DESTINATIONS: [Destination; 3] = [
    Destination {
        routing_key: ROUTING_KEY_COURSE_COMPLETED,
        condition: always,
    },
    Destination {
        routing_key: ROUTING_KEY_NOTIFICATION,
        condition: when_passed,
    },
    Destination {
        routing_key: ROUTING_KEY_ANALYTICS,
        condition: always,
    },
];

/// What happened to one publish call. Informational only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub sent: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

#[derive(Clone)]
pub struct EventPublisher {
    broker: Arc<dyn MessageBroker>,
    exchange: String,
    destinations: Vec<Destination>,
    metrics: Option<Arc<Metrics>>,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>, exchange: impl Into<String>) -> Self {
        Self {
            broker,
            exchange: exchange.into(),
            destinations: COURSE_COMPLETED_DESTINATIONS.to_vec(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Publish a course completion. Never fails from the caller's view.
    pub async fn publish(&self, event: &CourseCompletedEvent) -> PublishReport {
        self.publish_payload(event, serialize_event(event)).await
    }

    async fn publish_payload(
        &self,
        event: &CourseCompletedEvent,
        payload: serde_json::Result<Vec<u8>>,
    ) -> PublishReport {
        let mut report = PublishReport::default();

        let payload = match payload {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::error!(
                    learner_id = %event.learner_id(),
                    error = %e,
                    "Failed to serialize course completion, nothing published"
                );
                None
            }
        };

        for destination in &self.destinations {
            if !(destination.condition)(event) {
                report.skipped.push(destination.routing_key);
                continue;
            }

            // Destinations the event qualifies for count as failed without a payload
            let Some(payload) = &payload else {
                report.failed.push(destination.routing_key);
                if let Some(metrics) = &self.metrics {
                    metrics.record_publish(destination.routing_key, false);
                }
                continue;
            };

            let message = OutboundMessage::new(self.exchange.as_str(), destination.routing_key, payload.clone());
            let message_id = message.message_id;

            let success = match self.broker.send(message).await {
                Ok(()) => {
                    tracing::debug!(
                        learner_id = %event.learner_id(),
                        routing_key = destination.routing_key,
                        message_id = %message_id,
                        "Published course completion"
                    );
                    report.sent.push(destination.routing_key);
                    true
                }
                Err(e) => {
                    tracing::error!(
                        learner_id = %event.learner_id(),
                        routing_key = destination.routing_key,
                        error = %e,
                        "Failed to publish course completion"
                    );
                    report.failed.push(destination.routing_key);
                    false
                }
            };

            if let Some(metrics) = &self.metrics {
                metrics.record_publish(destination.routing_key, success);
            }
        }

        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::learner::LearnerId;
    use crate::messaging::broker::BrokerError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every send; optionally fails for one routing key.
    #[derive(Default)]
    pub(crate) struct RecordingBroker {
        pub sent: Mutex<Vec<OutboundMessage>>,
        pub fail_on: Option<&'static str>,
    }

    impl RecordingBroker {
        pub fn failing_on(routing_key: &'static str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on: Some(routing_key),
            }
        }

        pub fn routing_keys(&self) -> Vec<String> {
            self.sent.lock().iter().map(|m| m.routing_key.clone()).collect()
        }
    }

    #[async_trait]
    impl MessageBroker for RecordingBroker {
        async fn send(&self, message: OutboundMessage) -> Result<(), BrokerError> {
            if self.fail_on == Some(message.routing_key.as_str()) {
                return Err(BrokerError::Unavailable("connection refused".to_string()));
            }
            self.sent.lock().push(message);
            Ok(())
        }
    }

    fn event(passed: bool) -> CourseCompletedEvent {
        let average = if passed { 8.5 } else { 6.0 };
        CourseCompletedEvent::of(LearnerId(1), "Ada", 1, if passed { 3 } else { 0 }, average, passed)
    }

    #[tokio::test]
    async fn test_passed_event_sends_three_messages_in_order() {
        let broker = Arc::new(RecordingBroker::default());
        let publisher = EventPublisher::new(broker.clone(), "gamification.events");

        let report = publisher.publish(&event(true)).await;

        assert_eq!(
            broker.routing_keys(),
            vec![ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_NOTIFICATION, ROUTING_KEY_ANALYTICS]
        );
        assert_eq!(report.attempted(), 3);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_failed_event_skips_notification() {
        let broker = Arc::new(RecordingBroker::default());
        let publisher = EventPublisher::new(broker.clone(), "gamification.events");

        let report = publisher.publish(&event(false)).await;

        assert_eq!(broker.routing_keys(), vec![ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_ANALYTICS]);
        assert_eq!(report.skipped, vec![ROUTING_KEY_NOTIFICATION]);
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_later_destinations() {
        let broker = Arc::new(RecordingBroker::failing_on(ROUTING_KEY_NOTIFICATION));
        let metrics = Arc::new(Metrics::new().unwrap());
        let publisher = EventPublisher::new(broker.clone(), "gamification.events").with_metrics(metrics.clone());

        let report = publisher.publish(&event(true)).await;

        assert_eq!(broker.routing_keys(), vec![ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_ANALYTICS]);
        assert_eq!(report.failed, vec![ROUTING_KEY_NOTIFICATION]);
        assert_eq!(
            metrics.events_publish_failed.with_label_values(&[ROUTING_KEY_NOTIFICATION]).get(),
            1
        );
        assert_eq!(metrics.events_published.with_label_values(&[ROUTING_KEY_ANALYTICS]).get(), 1);
    }

    #[tokio::test]
    async fn test_unserializable_event_reports_only_qualifying_destinations() {
        let broker = Arc::new(RecordingBroker::default());
        let publisher = EventPublisher::new(broker.clone(), "gamification.events");
        let bad_payload = serde_json::from_str::<serde_json::Value>("{").map(|_| Vec::new());

        let report = publisher.publish_payload(&event(false), bad_payload).await;

        assert!(broker.routing_keys().is_empty());
        assert!(report.sent.is_empty());
        assert_eq!(report.failed, vec![ROUTING_KEY_COURSE_COMPLETED, ROUTING_KEY_ANALYTICS]);
        assert_eq!(report.skipped, vec![ROUTING_KEY_NOTIFICATION]);
    }

    #[tokio::test]
    async fn test_payload_is_the_event_json() {
        let broker = Arc::new(RecordingBroker::default());
        let publisher = EventPublisher::new(broker.clone(), "gamification.events");
        let event = event(true);

        publisher.publish(&event).await;

        let sent = broker.sent.lock();
        let decoded: CourseCompletedEvent = serde_json::from_slice(&sent[0].payload).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(sent[0].exchange, "gamification.events");
    }
}
