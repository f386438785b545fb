// ============================================================================
// learner_progress
// ============================================================================
//
// Learner progress tracking with a course-completion event fanned out over a
// topic exchange to three independent consumers.
//
// Layers:
// - domain       - Learner aggregate, value objects, credit strategies, events
// - application  - use cases over a LearnerRepository port
// - messaging    - topology, brokers, publisher, consumer handlers
// - actors       - queue consumers and the health monitor (kameo)
// - metrics      - Prometheus registry and HTTP exposition
// - utils        - circuit breaker
// - config       - environment configuration
//
// ============================================================================

pub mod actors;
pub mod application;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod utils;
