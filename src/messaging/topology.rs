use std::time::Duration;

use crate::config::AppConfig;

// ============================================================================
// Broker Topology - Topic Exchange, Queues, Bindings
// ============================================================================
//
//                    ┌──────────────────────────────┐
//                    │ exchange: gamification.events │
//                    └──────────────┬───────────────┘
//          ┌────────────────────────┼────────────────────────┐
//   course.completed          notification.#             analytics.#
//          ▼                        ▼                        ▼
//   course-completed (24h)   notification (1h)        analytics (7d)
//
// Routing follows AMQP topic semantics: keys and patterns are dot-separated
// words, `*` matches exactly one word and `#` matches zero or more words.
//
// ============================================================================

pub const ROUTING_KEY_COURSE_COMPLETED: &str = "course.completed";
pub const ROUTING_KEY_NOTIFICATION: &str = "notification.course.completed";
pub const ROUTING_KEY_ANALYTICS: &str = "analytics.gamification";

pub const BINDING_COURSE_COMPLETED: &str = "course.completed";
pub const BINDING_NOTIFICATION: &str = "notification.#";
pub const BINDING_ANALYTICS: &str = "analytics.#";

pub const TTL_COURSE_COMPLETED: Duration = Duration::from_secs(24 * 60 * 60);
pub const TTL_NOTIFICATION: Duration = Duration::from_secs(60 * 60);
pub const TTL_ANALYTICS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A durable queue bound to the exchange with one pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSpec {
    pub name: String,
    pub binding_pattern: String,
    pub message_ttl: Duration,
    pub durable: bool,
}

impl QueueSpec {
    pub fn new(name: impl Into<String>, binding_pattern: impl Into<String>, message_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            binding_pattern: binding_pattern.into(),
            message_ttl,
            durable: true,
        }
    }

    pub fn accepts(&self, routing_key: &str) -> bool {
        topic_matches(&self.binding_pattern, routing_key)
    }
}

/// Which of the three consumer roles a queue serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueRole {
    CourseCompleted,
    Notification,
    Analytics,
}

#[derive(Debug, Clone)]
pub struct Topology {
    pub exchange: String,
    pub course_completed: QueueSpec,
    pub notification: QueueSpec,
    pub analytics: QueueSpec,
}

impl Topology {
    pub fn new(
        exchange: impl Into<String>,
        course_completed_queue: impl Into<String>,
        notification_queue: impl Into<String>,
        analytics_queue: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            course_completed: QueueSpec::new(
                course_completed_queue,
                BINDING_COURSE_COMPLETED,
                TTL_COURSE_COMPLETED,
            ),
            notification: QueueSpec::new(notification_queue, BINDING_NOTIFICATION, TTL_NOTIFICATION),
            analytics: QueueSpec::new(analytics_queue, BINDING_ANALYTICS, TTL_ANALYTICS),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.exchange_name.clone(),
            config.queue_course_completed.clone(),
            config.queue_notification.clone(),
            config.queue_analytics.clone(),
        )
    }

    pub fn queues(&self) -> [&QueueSpec; 3] {
        [&self.course_completed, &self.notification, &self.analytics]
    }

    pub fn queue(&self, role: QueueRole) -> &QueueSpec {
        match role {
            QueueRole::CourseCompleted => &self.course_completed,
            QueueRole::Notification => &self.notification,
            QueueRole::Analytics => &self.analytics,
        }
    }

    pub fn queue_by_name(&self, name: &str) -> Option<&QueueSpec> {
        self.queues().into_iter().find(|q| q.name == name)
    }

    /// Queues a message published with `routing_key` lands in.
    pub fn route(&self, routing_key: &str) -> Vec<&QueueSpec> {
        self.queues()
            .into_iter()
            .filter(|q| q.accepts(routing_key))
            .collect()
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(
            "gamification.events",
            "gamification.course.completed",
            "gamification.notification",
            "gamification.analytics",
        )
    }
}

/// AMQP topic matching of `routing_key` against a binding `pattern`.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            // `#` swallows zero or more words
            (0..=key.len()).any(|skip| match_words(rest, &key[skip..]))
        }
        Some((&word, rest)) => match key.split_first() {
            Some((&first, key_rest)) if word == "*" || word == first => match_words(rest, key_rest),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(topic_matches("course.completed", "course.completed"));
        assert!(!topic_matches("course.completed", "course.completed.extra"));
        assert!(!topic_matches("course.completed", "course"));
        assert!(!topic_matches("course.completed", "notification.course.completed"));
    }

    #[test]
    fn test_hash_wildcard() {
        assert!(topic_matches("notification.#", "notification.course.completed"));
        assert!(topic_matches("notification.#", "notification"));
        assert!(topic_matches("analytics.#", "analytics.gamification"));
        assert!(!topic_matches("analytics.#", "course.completed"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("#.completed", "course.completed"));
    }

    #[test]
    fn test_star_wildcard() {
        assert!(topic_matches("*.completed", "course.completed"));
        assert!(!topic_matches("*.completed", "notification.course.completed"));
        assert!(!topic_matches("course.*", "course"));
    }

    #[test]
    fn test_default_topology_routes() {
        let topology = Topology::default();

        let names = |key: &str| -> Vec<String> {
            topology.route(key).into_iter().map(|q| q.name.clone()).collect()
        };

        assert_eq!(names(ROUTING_KEY_COURSE_COMPLETED), vec!["gamification.course.completed"]);
        assert_eq!(names(ROUTING_KEY_NOTIFICATION), vec!["gamification.notification"]);
        assert_eq!(names(ROUTING_KEY_ANALYTICS), vec!["gamification.analytics"]);
        assert!(names("unrouted.key").is_empty());
    }

    #[test]
    fn test_queue_ttls_and_durability() {
        let topology = Topology::default();
        assert_eq!(topology.course_completed.message_ttl, Duration::from_secs(86_400));
        assert_eq!(topology.notification.message_ttl, Duration::from_secs(3_600));
        assert_eq!(topology.analytics.message_ttl, Duration::from_secs(604_800));
        assert!(topology.queues().iter().all(|q| q.durable));
    }

    #[test]
    fn test_queue_lookup() {
        let topology = Topology::default();
        assert_eq!(
            topology.queue_by_name("gamification.analytics").map(|q| q.binding_pattern.as_str()),
            Some("analytics.#")
        );
        assert!(topology.queue_by_name("missing").is_none());
        assert_eq!(topology.queue(QueueRole::Notification).binding_pattern, "notification.#");
    }
}
