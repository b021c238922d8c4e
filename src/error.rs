use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::observability::{self, SpanStatus};

/// Application error types
///
/// Every failure is recovered at the request boundary; none are fatal to the
/// process.
#[derive(Debug)]
pub enum AppError {
    /// Requested entity absent; surfaced as 404, not logged as an alarm
    NotFound { entity: &'static str },
    /// Deliberately triggered failure for demonstration
    SimulatedFailure(String),
    /// Exception propagated from handler logic, carries an error code
    Exception { message: String, code: String },
    /// Anything else
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity } => write!(f, "{} not found", entity),
            Self::SimulatedFailure(msg) => write!(f, "{}", msg),
            Self::Exception { message, .. } => write!(f, "{}", message),
            Self::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    fn code(&self) -> &str {
        match self {
            Self::Exception { code, .. } => code,
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    /// Single fallback stage for all handler failures
    ///
    /// If the request's span is still open here the handler did not seal it;
    /// record the failure on it and end it so no span is ever left open.
    fn into_response(self) -> Response {
        if let Some(span) = observability::current_span() {
            if !span.is_ended() {
                span.record_exception(self.to_string(), self.code());
                span.set_status(SpanStatus::error(self.to_string()));
                span.end();
            }
        }

        let (status, body) = match &self {
            Self::NotFound { entity } => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", entity) }),
            ),
            Self::SimulatedFailure(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            Self::Exception { message, code } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message, "code": code }),
            ),
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg, "code": "INTERNAL_ERROR" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{with_span_scope, SpanEmitter, TelemetrySender};

    #[test]
    fn test_error_display() {
        let error = AppError::NotFound { entity: "User" };
        assert_eq!(error.to_string(), "User not found");

        let error = AppError::Exception {
            message: "Simulated exception for testing".to_string(),
            code: "SIMULATED_ERROR".to_string(),
        };
        assert_eq!(error.to_string(), "Simulated exception for testing");
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = AppError::NotFound { entity: "Product" }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exception_response() {
        let response = AppError::Exception {
            message: "boom".to_string(),
            code: "SIMULATED_ERROR".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_fallback_seals_open_span() {
        let (sender, mut rx) = TelemetrySender::for_tests();
        let emitter = SpanEmitter::new(sender);

        with_span_scope(async move {
            let span = emitter.start_span("unfinished");
            let _ = AppError::Internal("unexpected".to_string()).into_response();
            assert!(span.is_ended());
        })
        .await;

        let finished = rx.recv().await.unwrap();
        assert!(finished.status.is_error());
        assert_eq!(finished.exception.unwrap().code, "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_fallback_ignores_sealed_span() {
        let (sender, mut rx) = TelemetrySender::for_tests();
        let emitter = SpanEmitter::new(sender);

        with_span_scope(async move {
            let span = emitter.start_span("finished");
            span.set_status(SpanStatus::Ok);
            span.end();
            let _ = AppError::NotFound { entity: "User" }.into_response();
        })
        .await;

        // Exactly one finished span, still OK.
        let finished = rx.recv().await.unwrap();
        assert_eq!(finished.status, SpanStatus::Ok);
        assert!(rx.try_recv().is_err());
    }
}
