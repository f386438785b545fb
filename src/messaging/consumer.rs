use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::event::{deserialize_event, DomainEvent};
use crate::domain::learner::CourseCompletedEvent;
use crate::metrics::Metrics;

use super::broker::Delivery;

// ============================================================================
// Event Consumers - three independent reactions to a course completion
// ============================================================================
//
// - CourseCompletedHandler: certificate issuance and milestone achievements
// - NotificationHandler:    congratulation message to the learner
// - AnalyticsHandler:       records the completion for aggregation
//
// Handlers trust the event as already validated. None of them is idempotent
// against redelivery; the natural dedup key would be
// (learner_id, completed_courses).
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to decode delivery: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Delivery on {queue} expired (ttl {ttl:?})")]
    Expired { queue: String, ttl: Duration },

    #[error("Handler {handler} failed: {message}")]
    Handler { handler: &'static str, message: String },
}

impl ConsumerError {
    pub fn handler(handler: &'static str, message: impl Into<String>) -> Self {
        Self::Handler {
            handler,
            message: message.into(),
        }
    }

    /// Label used by the `deliveries_failed_total` metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ConsumerError::Decode(_) => "decode",
            ConsumerError::Expired { .. } => "expired",
            ConsumerError::Handler { .. } => "handler",
        }
    }
}

/// Turn a delivery into the event it carries, dropping it if it outlived its queue TTL.
pub fn decode_delivery(delivery: &Delivery) -> Result<CourseCompletedEvent, ConsumerError> {
    if delivery.is_expired() {
        return Err(ConsumerError::Expired {
            queue: delivery.queue.clone(),
            ttl: delivery.message_ttl,
        });
    }
    Ok(deserialize_event(&delivery.payload)?)
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError>;
}

// ============================================================================
// Side-effect ports
// ============================================================================

#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue_certificate(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError>;
}

#[async_trait]
pub trait AchievementService: Send + Sync {
    async fn unlock_milestone(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &CourseCompletedEvent, message: &str) -> Result<(), ConsumerError>;
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError>;
}

/// Default side effects: structured log lines only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSideEffects;

#[async_trait]
impl CertificateIssuer for LoggingSideEffects {
    async fn issue_certificate(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        tracing::info!(
            learner_id = %event.learner_id(),
            learner_name = %event.learner_name(),
            course_average = event.course_average(),
            "Issuing certificate"
        );
        Ok(())
    }
}

#[async_trait]
impl AchievementService for LoggingSideEffects {
    async fn unlock_milestone(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        tracing::info!(
            learner_id = %event.learner_id(),
            completed_courses = event.completed_courses(),
            "Milestone reached"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for LoggingSideEffects {
    async fn notify(&self, event: &CourseCompletedEvent, message: &str) -> Result<(), ConsumerError> {
        tracing::info!(learner_id = %event.learner_id(), message, "Notification sent");
        Ok(())
    }
}

/// Feeds the Prometheus gamification aggregates.
pub struct MetricsAnalyticsSink {
    metrics: Arc<Metrics>,
}

impl MetricsAnalyticsSink {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl AnalyticsSink for MetricsAnalyticsSink {
    async fn record(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        self.metrics.record_course_completion(event);
        tracing::info!(
            learner_id = %event.learner_id(),
            completed_courses = event.completed_courses(),
            current_credits = event.current_credits(),
            course_average = event.course_average(),
            passed = event.passed(),
            occurred_at = %event.occurred_at(),
            "Analytics recorded"
        );
        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub struct CourseCompletedHandler {
    certificates: Arc<dyn CertificateIssuer>,
    achievements: Arc<dyn AchievementService>,
}

impl CourseCompletedHandler {
    pub fn new(certificates: Arc<dyn CertificateIssuer>, achievements: Arc<dyn AchievementService>) -> Self {
        Self {
            certificates,
            achievements,
        }
    }
}

#[async_trait]
impl EventHandler for CourseCompletedHandler {
    fn name(&self) -> &'static str {
        "course-completed"
    }

    async fn handle(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        tracing::info!(
            learner_id = %event.learner_id(),
            learner_name = %event.learner_name(),
            course_average = event.course_average(),
            passed = event.passed(),
            completed_courses = event.completed_courses(),
            current_credits = event.current_credits(),
            "Course completion received"
        );

        // Both side effects are attempted; the first failure is reported
        let certificate = if event.deserves_certificate() {
            self.certificates.issue_certificate(event).await
        } else {
            Ok(())
        };

        let milestone = if event.is_milestone() {
            self.achievements.unlock_milestone(event).await
        } else {
            Ok(())
        };

        certificate.and(milestone)
    }
}

pub struct NotificationHandler {
    notifier: Arc<dyn Notifier>,
}

impl NotificationHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn compose_message(event: &CourseCompletedEvent) -> String {
        let mut message = format!(
            "Congratulations {}! You completed a course with an average of {:.2}.",
            event.learner_name(),
            event.course_average()
        );
        if event.deserves_certificate() {
            message.push_str(" Your certificate is available for download.");
        }
        message
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn handle(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        let message = Self::compose_message(event);
        self.notifier.notify(event, &message).await
    }
}

pub struct AnalyticsHandler {
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsHandler {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl EventHandler for AnalyticsHandler {
    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn handle(&self, event: &CourseCompletedEvent) -> Result<(), ConsumerError> {
        self.sink.record(event).await
    }
}
