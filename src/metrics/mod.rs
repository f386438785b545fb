// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use crate::domain::learner::CourseCompletedEvent;

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Publisher sends per routing key (ok / failed)
// - Consumer deliveries per queue (handled / failed by reason)
// - Gamification aggregates fed by the analytics consumer
// - Broker circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Publisher
    pub events_published: IntCounterVec,
    pub events_publish_failed: IntCounterVec,

    // Consumers
    pub deliveries_handled: IntCounterVec,
    pub deliveries_failed: IntCounterVec,

    // Analytics aggregates
    pub course_completions: IntCounterVec,
    pub course_average: Histogram,
    pub learner_credits_last: IntGauge,
    pub certificates_eligible: IntCounter,
    pub milestones_reached: IntCounter,

    // Broker
    pub broker_circuit_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Events handed to the broker"),
            &["routing_key"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let events_publish_failed = IntCounterVec::new(
            Opts::new("events_publish_failed_total", "Broker sends that failed and were dropped"),
            &["routing_key"],
        )?;
        registry.register(Box::new(events_publish_failed.clone()))?;

        let deliveries_handled = IntCounterVec::new(
            Opts::new("deliveries_handled_total", "Deliveries processed by a consumer"),
            &["queue"],
        )?;
        registry.register(Box::new(deliveries_handled.clone()))?;

        let deliveries_failed = IntCounterVec::new(
            Opts::new("deliveries_failed_total", "Deliveries a consumer could not process"),
            &["queue", "reason"],
        )?;
        registry.register(Box::new(deliveries_failed.clone()))?;

        let course_completions = IntCounterVec::new(
            Opts::new("course_completions_total", "Course completions seen by analytics"),
            &["passed"],
        )?;
        registry.register(Box::new(course_completions.clone()))?;

        let course_average = Histogram::with_opts(
            HistogramOpts::new("course_average", "Distribution of course averages")
                .buckets(vec![2.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0]),
        )?;
        registry.register(Box::new(course_average.clone()))?;

        let learner_credits_last = IntGauge::new(
            "learner_credits_last",
            "Credit balance reported by the most recent completion",
        )?;
        registry.register(Box::new(learner_credits_last.clone()))?;

        let certificates_eligible = IntCounter::new(
            "certificates_eligible_total",
            "Completions that qualified for a certificate",
        )?;
        registry.register(Box::new(certificates_eligible.clone()))?;

        let milestones_reached = IntCounter::new(
            "milestones_reached_total",
            "Completions that landed on a course-count milestone",
        )?;
        registry.register(Box::new(milestones_reached.clone()))?;

        let broker_circuit_state = IntGauge::new(
            "broker_circuit_state",
            "Broker circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(broker_circuit_state.clone()))?;

        Ok(Self {
            registry,
            events_published,
            events_publish_failed,
            deliveries_handled,
            deliveries_failed,
            course_completions,
            course_average,
            learner_credits_last,
            certificates_eligible,
            milestones_reached,
            broker_circuit_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_publish(&self, routing_key: &str, success: bool) {
        if success {
            self.events_published.with_label_values(&[routing_key]).inc();
        } else {
            self.events_publish_failed.with_label_values(&[routing_key]).inc();
        }
    }

    pub fn record_delivery_handled(&self, queue: &str) {
        self.deliveries_handled.with_label_values(&[queue]).inc();
    }

    pub fn record_delivery_failed(&self, queue: &str, reason: &str) {
        self.deliveries_failed.with_label_values(&[queue, reason]).inc();
    }

    pub fn record_course_completion(&self, event: &CourseCompletedEvent) {
        let passed = if event.passed() { "true" } else { "false" };
        self.course_completions.with_label_values(&[passed]).inc();
        self.course_average.observe(event.course_average());
        self.learner_credits_last.set(i64::from(event.current_credits()));

        if event.deserves_certificate() {
            self.certificates_eligible.inc();
        }
        if event.is_milestone() {
            self.milestones_reached.inc();
        }
    }

    pub fn update_circuit_state(&self, state: i64) {
        self.broker_circuit_state.set(state);
    }
}
