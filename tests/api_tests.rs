//! End-to-end tests for the HTTP surface
//!
//! Requests go through the full router (middleware, handlers, error
//! fallback) via in-process `oneshot` calls; artificial latency is disabled
//! so the tests run deterministically.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use otel_demo::handlers::AppState;
use otel_demo::latency::Latency;
use otel_demo::metrics::{self, MetricRegistry, MetricsState};
use otel_demo::observability::{ExportPipeline, PipelineConfig, Resource, SpanEmitter, StdoutExporter};
use otel_demo::server::create_router;
use otel_demo::store::Store;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tower::ServiceExt;

/// One recorder per test binary; installing twice would fail.
fn shared_metrics() -> MetricsState {
    static METRICS: OnceLock<MetricsState> = OnceLock::new();
    METRICS
        .get_or_init(|| {
            let handle = metrics::init_metrics().expect("install Prometheus recorder");
            let mut registry = MetricRegistry::new();
            metrics::register_instruments(&mut registry, Arc::new(Store::with_demo_data()))
                .expect("register instruments");
            MetricsState {
                handle: Arc::new(handle),
                registry: Arc::new(registry),
            }
        })
        .clone()
}

fn test_state() -> AppState {
    let metrics_state = shared_metrics();
    let resource = Resource {
        service_name: "otel-demo-test".to_string(),
        service_version: "0.0.0".to_string(),
        environment: "test".to_string(),
    };
    let (sender, _pipeline) = ExportPipeline::spawn(
        Box::new(StdoutExporter),
        metrics_state.clone(),
        resource,
        PipelineConfig {
            export_interval: Duration::from_secs(600),
            max_batch_size: 512,
        },
    );

    AppState {
        store: Arc::new(Store::with_demo_data()),
        emitter: SpanEmitter::new(sender),
        latency: Latency::disabled(),
        metrics: metrics_state,
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = create_router(test_state());

    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());

    let (status, body) = get(app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_list_users_count_matches_collection() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/users").await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(body["count"].as_u64().unwrap() as usize, users.len());
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn test_list_products_count_matches_collection() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    let products = body["products"].as_array().unwrap();
    assert_eq!(body["count"].as_u64().unwrap() as usize, products.len());
    assert_eq!(products.len(), 3);
}

#[tokio::test]
async fn test_get_user_by_valid_id() {
    let app = create_router(test_state());

    for id in 1..=3 {
        let (status, body) = get(app.clone(), &format!("/api/users/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"].as_i64().unwrap(), id);
    }

    let (_, body) = get(app, "/api/users/1").await;
    assert_eq!(body["name"], "Alice Johnson");
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_get_user_not_found_variants() {
    let app = create_router(test_state());

    for id in ["999", "-1", "abc", "1.5"] {
        let (status, body) = get(app.clone(), &format!("/api/users/{}", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "id {:?}", id);
        assert_eq!(body["error"], "User not found");
    }
}

#[tokio::test]
async fn test_get_product_by_valid_id() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/products/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 2);
    assert_eq!(body["name"], "Mouse");
    assert_eq!(body["stock"], 200);
}

#[tokio::test]
async fn test_get_product_not_found() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/products/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn test_error_500_simulation() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/error/500").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error simulation");
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn test_error_exception_simulation() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/error/exception").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Simulated exception for testing");
    assert_eq!(body["code"], "SIMULATED_ERROR");
}

#[tokio::test]
async fn test_error_timeout_returns_ok_with_latency_disabled() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/error/timeout").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This took too long");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_router(test_state());

    let (status, body) = get(app, "/api/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_concurrent_list_requests() {
    let app = create_router(test_state());

    let mut handles = Vec::new();
    for _ in 0..5 {
        let app = app.clone();
        handles.push(tokio::spawn(async move { get(app, "/api/users").await }));
    }

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["users"].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn test_metrics_endpoint_content_type() {
    let app = create_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_metrics_scrape_reflects_requests() {
    let app = create_router(test_state());

    // Drive some traffic so the counter families exist.
    let _ = get(app.clone(), "/api/users").await;
    let _ = get(app.clone(), "/api/products/1").await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("# HELP"));
    assert!(text.contains("# TYPE"));

    let scrape =
        prometheus_parse::Scrape::parse(text.lines().map(|l| Ok(l.to_string()))).unwrap();
    let requests: Vec<_> = scrape
        .samples
        .iter()
        .filter(|s| s.metric == "business_requests_total")
        .collect();
    assert!(!requests.is_empty());
    assert!(requests
        .iter()
        .any(|s| s.labels.get("endpoint") == Some("/api/users")));

    // The observable gauge runs its callback at scrape time.
    assert!(scrape
        .samples
        .iter()
        .any(|s| s.metric == "business_product_inventory"
            && s.labels.get("product_name") == Some("Laptop")));
}
