use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which broker implementation backs the topic exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    /// In-process exchange, for local runs and tests
    Memory,
    Redpanda,
}

impl FromStr for BrokerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(BrokerKind::Memory),
            "redpanda" | "kafka" => Ok(BrokerKind::Redpanda),
            other => bail!("Unknown BROKER_KIND: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub broker_kind: BrokerKind,
    pub redpanda_brokers: String,
    /// Consumer group prefix; each queue consumes as `<prefix>.<queue>`
    pub consumer_group: String,
    pub exchange_name: String,
    pub queue_course_completed: String,
    pub queue_notification: String,
    pub queue_analytics: String,
    pub metrics_port: u16,
    pub send_timeout: Duration,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let metrics_port = var("METRICS_PORT", "9090")
            .parse::<u16>()
            .context("METRICS_PORT must be a port number")?;

        let send_timeout_ms = var("SEND_TIMEOUT_MS", "5000")
            .parse::<u64>()
            .context("SEND_TIMEOUT_MS must be a number of milliseconds")?;

        Ok(Self {
            broker_kind: var("BROKER_KIND", "memory").parse()?,
            redpanda_brokers: var("REDPANDA_BROKERS", "127.0.0.1:9092"),
            consumer_group: var("CONSUMER_GROUP", "learner-progress"),
            exchange_name: var("EXCHANGE_NAME", "gamification.events"),
            queue_course_completed: var("QUEUE_COURSE_COMPLETED", "gamification.course.completed"),
            queue_notification: var("QUEUE_NOTIFICATION", "gamification.notification"),
            queue_analytics: var("QUEUE_ANALYTICS", "gamification.analytics"),
            metrics_port,
            send_timeout: Duration::from_millis(send_timeout_ms),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            broker_kind: BrokerKind::Memory,
            redpanda_brokers: "127.0.0.1:9092".to_string(),
            consumer_group: "learner-progress".to_string(),
            exchange_name: "gamification.events".to_string(),
            queue_course_completed: "gamification.course.completed".to_string(),
            queue_notification: "gamification.notification".to_string(),
            queue_analytics: "gamification.analytics".to_string(),
            metrics_port: 9090,
            send_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.broker_kind, BrokerKind::Memory);
        assert_eq!(config.exchange_name, "gamification.events");
        assert_eq!(config.queue_notification, "gamification.notification");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BROKER_KIND", "Redpanda"),
            ("REDPANDA_BROKERS", "rp:9092"),
            ("EXCHANGE_NAME", "events"),
            ("SEND_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.broker_kind, BrokerKind::Redpanda);
        assert_eq!(config.redpanda_brokers, "rp:9092");
        assert_eq!(config.exchange_name, "events");
        assert_eq!(config.send_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values() {
        assert!(AppConfig::from_lookup(lookup(&[("METRICS_PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("SEND_TIMEOUT_MS", "-1")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("BROKER_KIND", "rabbit")])).is_err());
    }
}
