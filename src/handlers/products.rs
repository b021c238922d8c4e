use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::time::Instant;

use crate::error::AppError;
use crate::handlers::AppState;
use crate::metrics::{self, RequestLabels};
use crate::observability::SpanStatus;
use crate::store::Product;

/// Handle GET /api/products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let span = state.emitter.start_span("fetch_products_operation");
    let start = Instant::now();

    let products = state.store.products();
    span.set_attribute("operation.type", "inventory_query");
    span.set_attribute("product.count", products.len());

    metrics::record_request(RequestLabels::new().endpoint("/api/products").method("GET"));

    state.latency.backend_delay().await;

    metrics::record_operation_duration("fetch_products", start.elapsed());
    span.add_event("products_fetched", json!({ "count": products.len() }));
    span.set_status(SpanStatus::Ok);
    span.end();

    Json(json!({ "products": products, "count": products.len() }))
}

/// Handle GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let span = state.emitter.start_span("fetch_product_by_id");
    span.set_attribute("product.id", id.clone());

    metrics::record_request(
        RequestLabels::new()
            .endpoint("/api/products/:id")
            .method("GET"),
    );

    let product = id
        .parse::<i64>()
        .ok()
        .and_then(|id| state.store.find_product(id).cloned());

    match product {
        Some(product) => {
            span.add_event(
                "product_found",
                json!({ "product_id": product.id, "stock": product.stock }),
            );
            span.set_status(SpanStatus::Ok);
            span.end();
            Ok(Json(product))
        }
        None => {
            span.set_status(SpanStatus::error("Product not found"));
            span.end();
            Err(AppError::NotFound { entity: "Product" })
        }
    }
}
