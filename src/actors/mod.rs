// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for the consuming side.
//
// Structure:
// - core/           - Health vocabulary shared by every actor
// - infrastructure/ - Queue consumers and the health monitor
//
// Note: Learner logic stays in the domain and application layers.
//       Actors are reserved for infrastructure concerns only.
//
// ============================================================================

// Private module declarations
mod core;
mod infrastructure;

pub use core::{ComponentHealth, HealthStatus};
pub use infrastructure::{
    spawn_queue_pump, Deliver, DeliveryOutcome, GetSystemHealth, HealthMonitorActor, QueueClosed,
    QueueConsumer, SystemHealth, UpdateHealth, BROKER_COMPONENT,
};
