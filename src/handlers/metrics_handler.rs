use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::handlers::AppState;

/// Prometheus exposition content type
const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Handle /metrics endpoint
///
/// Renders the accumulated metric state, running observable-gauge callbacks
/// first. Responds 200 even before any custom metric has been recorded.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.render();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        body,
    )
}
