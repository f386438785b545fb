use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::message::{Context, Message};
use kameo::{Actor, Reply};
use serde::Serialize;

use crate::actors::core::{ComponentHealth, HealthStatus};
use crate::metrics::Metrics;
use crate::utils::CircuitBreaker;

// ============================================================================
// Health Monitor Actor - Aggregates component health
// ============================================================================
//
// Components (broker, queue consumers) push their status with UpdateHealth.
// When a broker circuit breaker is attached it is polled on an interval and
// its state mirrored into both the component map and the circuit gauge.
// The overall status is the worst component status.
//
// ============================================================================

pub const BROKER_COMPONENT: &str = "broker";

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

impl UpdateHealth {
    pub fn new(component: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            component: component.into(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug)]
pub struct GetSystemHealth;

#[derive(Debug, Clone, Serialize, Reply)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    broker_breaker: Option<CircuitBreaker>,
    metrics: Option<Arc<Metrics>>,
    poll_interval: Duration,
}

impl HealthMonitorActor {
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
            broker_breaker: None,
            metrics: None,
            poll_interval: Duration::from_secs(10),
        }
    }

    /// Poll this breaker as the `broker` component.
    pub fn with_broker_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.broker_breaker = Some(breaker);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let unhealthy: Vec<String> = self
            .components
            .iter()
            .filter_map(|(name, health)| match &health.status {
                HealthStatus::Unhealthy(msg) => Some(format!("{}: {}", name, msg)),
                _ => None,
            })
            .collect();

        if !unhealthy.is_empty() {
            return HealthStatus::Unhealthy(unhealthy.join(", "));
        }

        if self.components.values().any(|health| health.status.is_degraded()) {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}

impl Default for HealthMonitorActor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for HealthMonitorActor {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(state: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        tracing::info!("HealthMonitorActor started");

        if let Some(breaker) = state.broker_breaker.clone() {
            let metrics = state.metrics.clone();
            let poll_interval = state.poll_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poll_interval);
                loop {
                    interval.tick().await;

                    let circuit = breaker.state().await;
                    if let Some(metrics) = &metrics {
                        metrics.update_circuit_state(circuit.as_gauge());
                    }

                    let update = UpdateHealth::new(BROKER_COMPONENT, HealthStatus::from(circuit))
                        .with_details(breaker.name());

                    // Monitor gone, stop polling
                    if actor_ref.tell(update).send().await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(state)
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<UpdateHealth> for HealthMonitorActor {
    type Reply = ();

    async fn handle(&mut self, msg: UpdateHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        tracing::debug!(
            component = %msg.component,
            status = ?msg.status,
            "Updated component health"
        );

        let health = ComponentHealth::new(msg.component.clone(), msg.status);
        let health = match msg.details {
            Some(details) => health.with_details(details),
            None => health,
        };
        self.components.insert(msg.component, health);
    }
}

impl Message<GetSystemHealth> for HealthMonitorActor {
    type Reply = SystemHealth;

    async fn handle(&mut self, _msg: GetSystemHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        SystemHealth {
            overall_status: self.compute_overall_status(),
            components: self.components.clone(),
            check_time: Utc::now(),
        }
    }
}
