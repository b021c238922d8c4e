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
use crate::store::User;

/// Handle GET /api/users
pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    let span = state.emitter.start_span("fetch_users_operation");
    let start = Instant::now();

    let users = state.store.users();
    span.set_attribute("operation.type", "database_query");
    span.set_attribute("user.count", users.len());

    metrics::record_request(RequestLabels::new().endpoint("/api/users").method("GET"));

    // Simulated variable-latency backend.
    state.latency.backend_delay().await;

    metrics::record_operation_duration("fetch_users", start.elapsed());
    span.add_event("users_fetched", json!({ "count": users.len() }));
    span.set_status(SpanStatus::Ok);
    span.end();

    Json(json!({ "users": users, "count": users.len() }))
}

/// Handle GET /api/users/:id
///
/// Unparseable, negative, and absent identifiers all resolve to 404 with the
/// span marked as an error. Marking expected not-found outcomes as span
/// errors is kept for dashboard compatibility.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let span = state.emitter.start_span("fetch_user_by_id");
    span.set_attribute("user.id", id.clone());

    metrics::record_request(RequestLabels::new().endpoint("/api/users/:id").method("GET"));

    let user = id
        .parse::<i64>()
        .ok()
        .and_then(|id| state.store.find_user(id).cloned());

    match user {
        Some(user) => {
            span.add_event("user_found", json!({ "user_id": user.id }));
            span.set_status(SpanStatus::Ok);
            span.end();
            Ok(Json(user))
        }
        None => {
            span.set_status(SpanStatus::error("User not found"));
            span.end();
            Err(AppError::NotFound { entity: "User" })
        }
    }
}
