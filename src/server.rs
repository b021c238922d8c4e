use anyhow::Result;
use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::Config,
    handlers::{self, AppState},
    latency::Latency,
    metrics::{self, MetricRegistry, MetricsState},
    observability::{
        with_span_scope, ExportPipeline, OtlpHttpExporter, PipelineConfig, Resource, SpanEmitter,
        StdoutExporter, TelemetryExporter,
    },
    signals::setup_signal_handlers,
    store::Store,
};

/// Start the demo service
///
/// This function:
/// 1. Installs the metrics recorder and registers the instruments
/// 2. Spawns the telemetry export pipeline
/// 3. Sets up signal handlers for graceful shutdown
/// 4. Serves requests until a termination signal
/// 5. Flushes buffered telemetry with a bounded timeout, then returns
pub async fn start_server(config: Config) -> Result<()> {
    info!("Installing Prometheus metrics recorder...");
    let handle = Arc::new(metrics::init_metrics()?);

    let store = Arc::new(Store::with_demo_data());

    let mut registry = MetricRegistry::new();
    metrics::register_instruments(&mut registry, store.clone())?;
    let metrics_state = MetricsState {
        handle,
        registry: Arc::new(registry),
    };

    let resource = Resource::from_config(&config.telemetry);
    let exporter = build_exporter(&config)?;
    let (sender, pipeline) = ExportPipeline::spawn(
        exporter,
        metrics_state.clone(),
        resource,
        PipelineConfig {
            export_interval: Duration::from_secs(config.telemetry.export_interval_secs),
            max_batch_size: config.telemetry.max_batch_size,
        },
    );

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let state = AppState {
        store,
        emitter: SpanEmitter::new(sender),
        latency: Latency::from_config(&config.latency),
        metrics: metrics_state,
    };

    let app = create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!(
        service = %config.telemetry.service_name,
        environment = %config.telemetry.environment,
        collector = %config.telemetry.collector_url,
        "Starting demo service on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;

    // Telemetry loss is acceptable on shutdown; the process exits 0 either way.
    let timeout = Duration::from_secs(config.telemetry.shutdown_timeout_secs);
    match pipeline.shutdown(timeout).await {
        Ok(()) => info!("Telemetry flushed, server stopped gracefully"),
        Err(e) => warn!(error = %e, "Telemetry flush failed on shutdown, exiting anyway"),
    }

    Ok(())
}

/// Pick the exporter named by the configuration
fn build_exporter(config: &Config) -> Result<Box<dyn TelemetryExporter>> {
    match config.telemetry.exporter.as_str() {
        "otlp" => Ok(Box::new(OtlpHttpExporter::new(
            &config.telemetry.collector_url,
        ))),
        "stdout" => Ok(Box::new(StdoutExporter)),
        other => anyhow::bail!("Unknown telemetry exporter: {}", other),
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Traced API routes get the request-scope middleware; health probes and
    // the scrape endpoint stay outside it.
    let api_routes = Router::new()
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/:id", get(handlers::users::get_user))
        .route("/api/products", get(handlers::products::list_products))
        .route("/api/products/:id", get(handlers::products::get_product))
        .route("/api/error/500", get(handlers::errors::simulate_500))
        .route("/api/error/timeout", get(handlers::errors::simulate_timeout))
        .route(
            "/api/error/exception",
            get(handlers::errors::simulate_exception),
        )
        .layer(middleware::from_fn(request_scope))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(state)
        .merge(api_routes)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
}

/// Per-request middleware: ambient span slot plus in-flight tracking
///
/// The span slot is scoped to this request's task, so concurrently handled
/// requests cannot see each other's active span.
async fn request_scope(req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    metrics::in_flight_add(&endpoint);
    let response = with_span_scope(next.run(req)).await;
    metrics::in_flight_sub(&endpoint);

    response
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_build_exporter_variants() {
        let mut config = Config::default();
        assert!(build_exporter(&config).is_ok());

        config.telemetry.exporter = "stdout".to_string();
        assert!(build_exporter(&config).is_ok());

        config.telemetry.exporter = "carrier-pigeon".to_string();
        assert!(build_exporter(&config).is_err());
    }
}
