use std::sync::Arc;

use kameo::actor::ActorRef;
use kameo::Actor;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use learner_progress::actors::{spawn_queue_pump, GetSystemHealth, HealthMonitorActor, QueueConsumer};
use learner_progress::application::{InMemoryLearnerRepository, ProgressService};
use learner_progress::config::{AppConfig, BrokerKind};
use learner_progress::messaging::{
    AnalyticsHandler, CourseCompletedHandler, EventHandler, EventPublisher, InMemoryTopicBroker,
    LoggingSideEffects, MessageBroker, MetricsAnalyticsSink, NotificationHandler, QueueRole, QueueSource,
    RedpandaBroker, RedpandaQueueSource, Topology,
};
use learner_progress::metrics::{self, Metrics};

const ROLES: [QueueRole; 3] = [QueueRole::CourseCompleted, QueueRole::Notification, QueueRole::Analytics];

fn handler_for(role: QueueRole, metrics: &Arc<Metrics>) -> Arc<dyn EventHandler> {
    match role {
        QueueRole::CourseCompleted => Arc::new(CourseCompletedHandler::new(
            Arc::new(LoggingSideEffects),
            Arc::new(LoggingSideEffects),
        )),
        QueueRole::Notification => Arc::new(NotificationHandler::new(Arc::new(LoggingSideEffects))),
        QueueRole::Analytics => Arc::new(AnalyticsHandler::new(Arc::new(MetricsAnalyticsSink::new(
            metrics.clone(),
        )))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,learner_progress=debug")),
        )
        .init();

    tracing::info!("🚀 Starting learner progress service");

    // === 1. Configuration and topology ===
    let config = AppConfig::from_env()?;
    let topology = Topology::from_config(&config);
    tracing::info!(
        broker = ?config.broker_kind,
        exchange = %topology.exchange,
        "Configuration loaded"
    );

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Broker and queue sources ===
    let mut health = HealthMonitorActor::new().with_metrics(metrics.clone());

    let (broker, sources): (Arc<dyn MessageBroker>, Vec<Box<dyn QueueSource>>) = match config.broker_kind {
        BrokerKind::Memory => {
            let broker = InMemoryTopicBroker::new(topology.clone());
            let mut sources: Vec<Box<dyn QueueSource>> = Vec::new();
            for role in ROLES {
                sources.push(Box::new(broker.subscribe(&topology.queue(role).name)?));
            }
            (Arc::new(broker), sources)
        }
        BrokerKind::Redpanda => {
            let broker = RedpandaBroker::new(&config.redpanda_brokers, topology.clone(), config.send_timeout)?;
            health = health.with_broker_breaker(broker.circuit_breaker());

            let mut sources: Vec<Box<dyn QueueSource>> = Vec::new();
            for role in ROLES {
                sources.push(Box::new(RedpandaQueueSource::new(
                    &config.redpanda_brokers,
                    &config.consumer_group,
                    topology.queue(role).clone(),
                )?));
            }
            (Arc::new(broker), sources)
        }
    };

    // === 4. Health monitor and consumers ===
    let health: ActorRef<HealthMonitorActor> = HealthMonitorActor::spawn(health);

    for (role, source) in ROLES.into_iter().zip(sources) {
        let consumer = QueueConsumer::spawn(
            QueueConsumer::new(topology.queue(role).name.clone(), handler_for(role, &metrics))
                .with_metrics(metrics.clone())
                .with_health_monitor(health.clone()),
        );
        spawn_queue_pump(source, consumer);
    }

    // Start metrics HTTP server in background thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_health = health.clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new().block_on(metrics::start_metrics_server(
            metrics_registry,
            Some(metrics_health),
            metrics_port,
        ));
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 5. Demonstrate a learner's progress ===
    let publisher = EventPublisher::new(broker, topology.exchange.clone()).with_metrics(metrics.clone());
    let service = ProgressService::new(Arc::new(InMemoryLearnerRepository::new()), publisher);

    let learner = service.register_learner("Ada Lovelace", 0).await?;
    let learner_id = learner
        .id()
        .ok_or_else(|| anyhow::anyhow!("repository did not assign an id"))?;

    for average in [8.5, 7.0, 6.2, 9.35, 9.8] {
        let completion = service.complete_course(learner_id, average).await?;
        tracing::info!(
            "✅ Course {} done with {:.2}: +{} credits ({} total)",
            completion.learner.completed_courses(),
            average,
            completion.credits_awarded,
            completion.learner.credits()
        );
    }

    // Give the consumers a moment to drain their queues
    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;

    match health.ask(GetSystemHealth).await {
        Ok(system) => tracing::info!(
            status = ?system.overall_status,
            components = system.components.len(),
            "System health"
        ),
        Err(_) => tracing::warn!("Health monitor did not answer"),
    }

    tracing::info!("⏳ Serving metrics on port {}, press Ctrl+C to stop", config.metrics_port);
    tokio::signal::ctrl_c().await?;

    tracing::info!("🎉 Shutting down");
    Ok(())
}
