// ============================================================================
// Learner Domain - Progress Tracking and Gamification Rules
// ============================================================================
//
// This module contains ALL Learner-specific code:
// - Business rule constants (passing threshold, award size)
// - Value objects (Average, PerformanceLevel, Credits)
// - Errors (LearnerError with stable codes)
// - Credit strategies (Standard, Premium) and their registry
// - Aggregate (Learner)
// - Events (CourseCompletedEvent)
//
// ============================================================================

pub mod rules;
pub mod value_objects;
pub mod errors;
pub mod strategy;
pub mod aggregate;
pub mod events;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use strategy::*;
pub use aggregate::*;
pub use events::*;
