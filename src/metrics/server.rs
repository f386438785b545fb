use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use kameo::actor::ActorRef;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::actors::{GetSystemHealth, HealthMonitorActor};

const SERVICE_NAME: &str = "learner-progress";

/// Start the metrics HTTP server
/// This should be called in a separate thread/runtime to avoid conflicts
pub async fn start_metrics_server(
    registry: Arc<Registry>,
    health: Option<ActorRef<HealthMonitorActor>>,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(health.clone()))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(health: web::Data<Option<ActorRef<HealthMonitorActor>>>) -> impl Responder {
    let Some(monitor) = health.get_ref() else {
        return HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "service": SERVICE_NAME
        }));
    };

    match monitor.ask(GetSystemHealth).await {
        Ok(system) => {
            let body = serde_json::json!({
                "status": system.overall_status,
                "service": SERVICE_NAME,
                "components": system.components,
                "checkTime": system.check_time,
            });
            if system.overall_status.is_unhealthy() {
                HttpResponse::ServiceUnavailable().json(body)
            } else {
                HttpResponse::Ok().json(body)
            }
        }
        Err(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unknown",
            "service": SERVICE_NAME
        })),
    }
}
