use std::sync::Arc;
use std::time::Duration;

use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::message::{Context, Message};
use kameo::{Actor, Reply};
use tokio::task::JoinHandle;

use super::health_monitor::{HealthMonitorActor, UpdateHealth};
use crate::actors::core::HealthStatus;
use crate::messaging::consumer::{decode_delivery, EventHandler};
use crate::messaging::{Delivery, QueueSource};
use crate::metrics::Metrics;

// ============================================================================
// Queue Consumer Actor - one per queue
// ============================================================================
//
// A pump task pulls deliveries from the queue source and hands them to the
// actor one at a time, so a queue is processed in order while different
// queues run concurrently. Failures (decode, expired, handler) are logged
// and counted, then the delivery is dropped; nothing is redelivered.
//
// ============================================================================

const SOURCE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Deliver(pub Delivery);

/// Sent by the pump when the queue source is exhausted.
#[derive(Debug)]
pub struct QueueClosed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reply)]
pub enum DeliveryOutcome {
    Handled,
    Dropped(&'static str),
}

pub struct QueueConsumer {
    queue: String,
    handler: Arc<dyn EventHandler>,
    metrics: Option<Arc<Metrics>>,
    health: Option<ActorRef<HealthMonitorActor>>,
}

impl QueueConsumer {
    pub fn new(queue: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            queue: queue.into(),
            handler,
            metrics: None,
            health: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_health_monitor(mut self, health: ActorRef<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    fn component(&self) -> String {
        format!("consumer:{}", self.handler.name())
    }

    async fn report(&self, status: HealthStatus) {
        if let Some(health) = &self.health {
            let update = UpdateHealth::new(self.component(), status).with_details(self.queue.as_str());
            if health.tell(update).send().await.is_err() {
                tracing::warn!(queue = %self.queue, "Health monitor unreachable");
            }
        }
    }
}

impl Actor for QueueConsumer {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(state: Self::Args, _actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        tracing::info!(
            queue = %state.queue,
            handler = state.handler.name(),
            "QueueConsumer started"
        );
        state.report(HealthStatus::Healthy).await;
        Ok(state)
    }
}

impl Message<Deliver> for QueueConsumer {
    type Reply = DeliveryOutcome;

    async fn handle(&mut self, msg: Deliver, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let delivery = msg.0;

        let result = match decode_delivery(&delivery) {
            Ok(event) => self.handler.handle(&event).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_delivery_handled(&self.queue);
                }
                tracing::debug!(
                    queue = %self.queue,
                    message_id = %delivery.message_id,
                    "Delivery handled"
                );
                DeliveryOutcome::Handled
            }
            Err(e) => {
                let reason = e.reason();
                if let Some(metrics) = &self.metrics {
                    metrics.record_delivery_failed(&self.queue, reason);
                }
                tracing::warn!(
                    queue = %self.queue,
                    message_id = %delivery.message_id,
                    routing_key = %delivery.routing_key,
                    error = %e,
                    "Delivery dropped"
                );
                DeliveryOutcome::Dropped(reason)
            }
        }
    }
}

impl Message<QueueClosed> for QueueConsumer {
    type Reply = ();

    async fn handle(&mut self, _msg: QueueClosed, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        tracing::warn!(queue = %self.queue, "Queue closed");
        self.report(HealthStatus::Unhealthy("queue closed".to_string())).await;
    }
}

/// Feed `source` into `consumer` until the source closes or the actor stops.
pub fn spawn_queue_pump(mut source: Box<dyn QueueSource>, consumer: ActorRef<QueueConsumer>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let queue = source.queue_name().to_string();

        while let Some(next) = source.next_delivery().await {
            match next {
                Ok(delivery) => {
                    if consumer.tell(Deliver(delivery)).send().await.is_err() {
                        tracing::error!(queue = %queue, "Consumer actor stopped, pump exiting");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "Failed to receive delivery");
                    tokio::time::sleep(SOURCE_ERROR_BACKOFF).await;
                }
            }
        }

        let _ = consumer.tell(QueueClosed).send().await;
    })
}
