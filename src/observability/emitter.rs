//! Span emitter and ambient active-span slot
//!
//! Handlers open spans through [`SpanEmitter::start_span`] and seal them with
//! [`SpanHandle::end`]. The handle is also stored in a `task_local!` slot
//! scoped to one request, so the error fallback can find the active span
//! without it being threaded through call signatures. The slot lives and dies
//! with the request task and cannot leak across concurrent requests.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use crate::observability::pipeline::TelemetrySender;
use crate::observability::span::{Span, SpanStatus};

tokio::task_local! {
    static ACTIVE_SPAN: Mutex<Option<SpanHandle>>;
}

/// Run a future with a fresh ambient span slot
///
/// Installed by the request-scope middleware around every traced route.
pub async fn with_span_scope<F>(fut: F) -> F::Output
where
    F: std::future::Future,
{
    ACTIVE_SPAN.scope(Mutex::new(None), fut).await
}

/// Look up the span currently active in this task, if any
pub fn current_span() -> Option<SpanHandle> {
    ACTIVE_SPAN
        .try_with(|slot| lock_slot(slot).clone())
        .ok()
        .flatten()
}

fn set_current(handle: SpanHandle) {
    // Outside a request scope (unit tests, background tasks) there is no
    // slot; the span still works, it just cannot be looked up ambiently.
    let _ = ACTIVE_SPAN.try_with(|slot| {
        *lock_slot(slot) = Some(handle);
    });
}

fn lock_slot(slot: &Mutex<Option<SpanHandle>>) -> MutexGuard<'_, Option<SpanHandle>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Creates spans wired to the export pipeline
#[derive(Clone)]
pub struct SpanEmitter {
    sender: TelemetrySender,
}

impl SpanEmitter {
    pub fn new(sender: TelemetrySender) -> Self {
        Self { sender }
    }

    /// Start a span, inheriting the ambient parent when one is active
    ///
    /// The new span replaces the task's ambient active span until it is
    /// ended (or the request scope ends).
    pub fn start_span(&self, name: impl Into<String>) -> SpanHandle {
        let span = match current_span().and_then(|h| h.trace_context()) {
            Some((trace_id, parent_span_id)) => Span::child_of(&trace_id, &parent_span_id, name),
            None => Span::new_root(name),
        };

        let handle = SpanHandle {
            cell: Arc::new(Mutex::new(SpanCell {
                span: Some(span),
                sender: self.sender.clone(),
            })),
        };
        set_current(handle.clone());
        handle
    }
}

struct SpanCell {
    span: Option<Span>,
    sender: TelemetrySender,
}

impl Drop for SpanCell {
    fn drop(&mut self) {
        // Abandoned spans (aborted request futures, handler bugs) are still
        // sealed with whatever status is known rather than left open.
        if let Some(span) = self.span.take() {
            warn!(span_name = %span.name, "Span dropped without end(), sealing best-effort");
            self.sender.send_span(span.seal());
        }
    }
}

/// Shared handle to one open span
///
/// Cloning is cheap; the handler and the ambient slot hold clones of the same
/// underlying span. All mutators are guarded no-ops once the span has ended.
#[derive(Clone)]
pub struct SpanHandle {
    cell: Arc<Mutex<SpanCell>>,
}

impl SpanHandle {
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.with_open("set_attribute", |span| span.set_attribute(key, value));
    }

    pub fn add_event(&self, name: impl Into<String>, attributes: Value) {
        self.with_open("add_event", |span| span.add_event(name, attributes));
    }

    pub fn record_exception(&self, message: impl Into<String>, code: impl Into<String>) {
        self.with_open("record_exception", |span| span.record_exception(message, code));
    }

    pub fn set_status(&self, status: SpanStatus) {
        self.with_open("set_status", |span| span.set_status(status));
    }

    /// Seal the span and hand it to the export pipeline
    ///
    /// Calling `end()` a second time is a usage error; it warns and no-ops
    /// instead of corrupting telemetry state.
    pub fn end(&self) {
        let mut cell = self.lock();
        match cell.span.take() {
            Some(span) => {
                let finished = span.seal();
                cell.sender.send_span(finished);
            }
            None => warn!("end() called on a span that was already ended"),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.lock().span.is_none()
    }

    /// Trace context for child spans, while the span is still open
    pub fn trace_context(&self) -> Option<(String, String)> {
        let cell = self.lock();
        cell.span
            .as_ref()
            .map(|s| (s.trace_id.clone(), s.span_id.clone()))
    }

    fn with_open(&self, op: &str, f: impl FnOnce(&mut Span)) {
        let mut cell = self.lock();
        match cell.span.as_mut() {
            Some(span) => f(span),
            None => warn!(operation = op, "Ignoring mutation of an ended span"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SpanCell> {
        self.cell
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
