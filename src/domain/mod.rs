// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Learner progress model:
// - Value objects (Average, Credits)
// - Credit award strategies and their registry
// - The Learner aggregate
// - The CourseCompleted domain event
//
// Nothing in here knows about brokers, persistence or HTTP.
//
// ============================================================================

pub mod event;
pub mod learner;
