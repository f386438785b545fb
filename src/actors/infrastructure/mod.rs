// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// - Queue consumption (one actor per queue, fed by a pump task)
// - Health monitoring
//
// ============================================================================

// Private module declarations
mod health_monitor;
mod queue_consumer;

// Re-export for public API
pub use health_monitor::{
    GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth, BROKER_COMPONENT,
};
pub use queue_consumer::{spawn_queue_pump, Deliver, DeliveryOutcome, QueueClosed, QueueConsumer};
