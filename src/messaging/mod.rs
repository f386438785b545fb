// ============================================================================
// Messaging Module
// ============================================================================
//
// Topic exchange plumbing for course-completion events:
// - topology   - exchange, queues, bindings, TTLs, topic matching
// - broker     - MessageBroker / QueueSource ports
// - memory     - in-process topic exchange
// - redpanda   - exchange emulated on Redpanda topics
// - publisher  - fan-out of one event to its routing keys
// - consumer   - the three queue handlers
//
// ============================================================================

pub mod broker;
pub mod consumer;
pub mod memory;
pub mod publisher;
pub mod redpanda;
pub mod topology;

pub use broker::{BrokerError, Delivery, MessageBroker, OutboundMessage, QueueSource};
pub use consumer::{
    AnalyticsHandler, ConsumerError, CourseCompletedHandler, EventHandler, LoggingSideEffects,
    MetricsAnalyticsSink, NotificationHandler,
};
pub use memory::{InMemoryTopicBroker, MemoryQueueSource};
pub use publisher::{EventPublisher, PublishReport};
pub use redpanda::{RedpandaBroker, RedpandaQueueSource};
pub use topology::{QueueRole, QueueSpec, Topology};
