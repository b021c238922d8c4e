//! Deterministic failure simulations
//!
//! These routes never touch the entity store; they exist to exercise the
//! error paths of the telemetry emission contract.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::error::AppError;
use crate::handlers::AppState;
use crate::metrics::{self, RequestLabels};
use crate::observability::SpanStatus;

/// Handle GET /api/error/500
pub async fn simulate_500(State(state): State<AppState>) -> AppError {
    let span = state.emitter.start_span("error_500_simulation");
    span.set_attribute("error.type", "simulated_500");
    span.set_status(SpanStatus::error("Simulated 500 error"));
    span.end();

    metrics::record_request(
        RequestLabels::new()
            .endpoint("/api/error/500")
            .method("GET")
            .status("500"),
    );

    AppError::SimulatedFailure("Internal server error simulation".to_string())
}

/// Handle GET /api/error/timeout
///
/// The failure here is the client giving up, not the server status: after a
/// long delay the response is still 200.
pub async fn simulate_timeout(State(state): State<AppState>) -> impl IntoResponse {
    state.latency.timeout_delay().await;
    Json(json!({ "message": "This took too long" }))
}

/// Handle GET /api/error/exception
///
/// The handler seals its span, then propagates the error so the fallback
/// stage produces the response with the `code` field.
pub async fn simulate_exception(State(state): State<AppState>) -> Result<(), AppError> {
    let span = state.emitter.start_span("exception_simulation");
    span.set_attribute("error.type", "simulated_exception");

    let message = "Simulated exception for testing";
    span.record_exception(message, "SIMULATED_ERROR");
    span.set_status(SpanStatus::error(message));
    span.end();

    metrics::record_request(
        RequestLabels::new()
            .endpoint("/api/error/exception")
            .method("GET")
            .status("error"),
    );

    Err(AppError::Exception {
        message: message.to_string(),
        code: "SIMULATED_ERROR".to_string(),
    })
}
