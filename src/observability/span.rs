//! Span data model for request tracing
//!
//! A [`Span`] is mutable while its owning handler runs; sealing it produces a
//! [`FinishedSpan`], the immutable record handed to the export pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Span kind (simplified from the OpenTelemetry taxonomy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Server-side request handler
    Server,
    /// Internal operation
    Internal,
}

/// Terminal status of a span
///
/// Downstream error-rate dashboards key off the `error` code, so every span
/// that did not complete successfully must carry it with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "lowercase")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { message: String },
}

impl SpanStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Timestamped event attached to a span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub attributes: Value,
}

/// Exception recorded on a span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub message: String,
    pub code: String,
}

/// A span that is still open and owned by one request handler
#[derive(Debug, Clone)]
pub struct Span {
    pub span_id: String,
    pub parent_span_id: Option<String>,
    /// Shared by all spans of one request
    pub trace_id: String,
    pub name: String,
    pub kind: SpanKind,
    pub start_ms: u64,
    pub attributes: Map<String, Value>,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
    pub exception: Option<ExceptionRecord>,
}

impl Span {
    /// Create a root span starting a new trace
    pub fn new_root(name: impl Into<String>) -> Self {
        Self {
            span_id: Uuid::new_v4().to_string(),
            parent_span_id: None,
            trace_id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind: SpanKind::Server,
            start_ms: current_millis(),
            attributes: Map::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
            exception: None,
        }
    }

    /// Create a child span continuing an existing trace
    pub fn child_of(trace_id: &str, parent_span_id: &str, name: impl Into<String>) -> Self {
        Self {
            span_id: Uuid::new_v4().to_string(),
            parent_span_id: Some(parent_span_id.to_string()),
            trace_id: trace_id.to_string(),
            name: name.into(),
            kind: SpanKind::Internal,
            start_ms: current_millis(),
            attributes: Map::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
            exception: None,
        }
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Value) {
        self.events.push(SpanEvent {
            name: name.into(),
            timestamp_ms: current_millis(),
            attributes,
        });
    }

    pub fn record_exception(&mut self, message: impl Into<String>, code: impl Into<String>) {
        self.exception = Some(ExceptionRecord {
            message: message.into(),
            code: code.into(),
        });
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    /// Seal the span, producing the exported record
    pub fn seal(self) -> FinishedSpan {
        let end_ms = current_millis();
        FinishedSpan {
            duration_ms: end_ms.saturating_sub(self.start_ms),
            end_ms,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            trace_id: self.trace_id,
            name: self.name,
            kind: self.kind,
            start_ms: self.start_ms,
            attributes: self.attributes,
            events: self.events,
            status: self.status,
            exception: self.exception,
        }
    }
}

/// Immutable record of a completed span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedSpan {
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub trace_id: String,
    pub name: String,
    pub kind: SpanKind,
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
    pub attributes: Map<String, Value>,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
    pub exception: Option<ExceptionRecord>,
}

/// Current time as Unix milliseconds, used for all span timestamps
pub fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
