//! Request-scoped telemetry emission
//!
//! Spans are created per request, mutated only by their owning handler, and
//! sealed exactly once on every exit path; the export pipeline ships them to
//! the collector asynchronously.

pub mod emitter;
pub mod exporter;
pub mod pipeline;
pub mod span;

pub use emitter::{current_span, with_span_scope, SpanEmitter, SpanHandle};
pub use exporter::{
    ExportError, MetricsSnapshot, OtlpHttpExporter, Resource, SpanBatch, StdoutExporter,
    TelemetryExporter,
};
pub use pipeline::{ExportPipeline, PipelineConfig, PipelineHandle, ShutdownError, TelemetrySender};
pub use span::{ExceptionRecord, FinishedSpan, Span, SpanEvent, SpanKind, SpanStatus};
