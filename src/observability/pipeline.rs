//! Export pipeline for completed spans and metric snapshots
//!
//! A background task buffers finished spans and flushes them to the
//! configured exporter when the buffer fills and on every interval tick.
//! Export failures are logged and swallowed; telemetry loss must never block
//! or fail the serving path.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::metrics::MetricsState;
use crate::observability::exporter::{MetricsSnapshot, Resource, SpanBatch, TelemetryExporter};
use crate::observability::span::FinishedSpan;

#[derive(Debug)]
pub(crate) enum PipelineMessage {
    Span(FinishedSpan),
    Shutdown { ack: oneshot::Sender<()> },
}

/// Non-blocking handle for submitting completed spans
///
/// Sends after the pipeline has shut down are silently dropped.
#[derive(Clone)]
pub struct TelemetrySender {
    tx: mpsc::UnboundedSender<PipelineMessage>,
}

impl TelemetrySender {
    pub fn send_span(&self, span: FinishedSpan) {
        let _ = self.tx.send(PipelineMessage::Span(span));
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, mpsc::UnboundedReceiver<FinishedSpan>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PipelineMessage>();
        let (span_tx, span_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let PipelineMessage::Span(span) = msg {
                    let _ = span_tx.send(span);
                }
            }
        });
        (Self { tx }, span_rx)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub export_interval: Duration,
    pub max_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            export_interval: Duration::from_secs(10),
            max_batch_size: 512,
        }
    }
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The final flush did not complete within the allowed time
    #[error("telemetry flush timed out")]
    FlushTimeout,
    /// The pipeline worker is no longer running
    #[error("telemetry pipeline worker is gone")]
    WorkerGone,
}

/// Owns the pipeline worker; used to drive graceful shutdown
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<PipelineMessage>,
}

impl PipelineHandle {
    /// Stop the pipeline: final flush of buffered telemetry, then an ack.
    ///
    /// Callers treat failure as acceptable telemetry loss; they log it and
    /// exit normally either way.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), ShutdownError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(PipelineMessage::Shutdown { ack: ack_tx })
            .map_err(|_| ShutdownError::WorkerGone)?;

        match tokio::time::timeout(timeout, ack_rx).await {
            Err(_) => Err(ShutdownError::FlushTimeout),
            Ok(Err(_)) => Err(ShutdownError::WorkerGone),
            Ok(Ok(())) => Ok(()),
        }
    }
}

pub struct ExportPipeline;

impl ExportPipeline {
    /// Spawn the background export task
    pub fn spawn(
        exporter: Box<dyn TelemetryExporter>,
        metrics: MetricsState,
        resource: Resource,
        config: PipelineConfig,
    ) -> (TelemetrySender, PipelineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(pipeline_task(exporter, metrics, resource, config, rx));

        (
            TelemetrySender { tx: tx.clone() },
            PipelineHandle { tx },
        )
    }
}

async fn pipeline_task(
    exporter: Box<dyn TelemetryExporter>,
    metrics: MetricsState,
    resource: Resource,
    config: PipelineConfig,
    mut rx: mpsc::UnboundedReceiver<PipelineMessage>,
) {
    let mut span_buffer: Vec<FinishedSpan> = Vec::with_capacity(config.max_batch_size);

    let mut flush_timer = tokio::time::interval(config.export_interval);
    flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick of an interval fires immediately.
    flush_timer.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(PipelineMessage::Span(span)) => {
                        span_buffer.push(span);
                        if span_buffer.len() >= config.max_batch_size {
                            flush_spans(exporter.as_ref(), &resource, &mut span_buffer).await;
                        }
                    }
                    Some(PipelineMessage::Shutdown { ack }) => {
                        info!("Telemetry pipeline shutting down, flushing buffered data");
                        drain_pending(&mut rx, &mut span_buffer);
                        flush_spans(exporter.as_ref(), &resource, &mut span_buffer).await;
                        flush_metrics(exporter.as_ref(), &resource, &metrics).await;
                        let _ = ack.send(());
                        break;
                    }
                    // All senders dropped: flush what is left and exit.
                    None => {
                        flush_spans(exporter.as_ref(), &resource, &mut span_buffer).await;
                        break;
                    }
                }
            }

            _ = flush_timer.tick() => {
                flush_spans(exporter.as_ref(), &resource, &mut span_buffer).await;
                flush_metrics(exporter.as_ref(), &resource, &metrics).await;
            }
        }
    }

    info!("Telemetry pipeline stopped");
}

/// Pull already-queued spans so a shutdown flush does not race late sends
fn drain_pending(rx: &mut mpsc::UnboundedReceiver<PipelineMessage>, buffer: &mut Vec<FinishedSpan>) {
    while let Ok(PipelineMessage::Span(span)) = rx.try_recv() {
        buffer.push(span);
    }
}

async fn flush_spans(exporter: &dyn TelemetryExporter, resource: &Resource, buffer: &mut Vec<FinishedSpan>) {
    if buffer.is_empty() {
        return;
    }

    let batch = SpanBatch {
        resource: resource.clone(),
        spans: std::mem::take(buffer),
    };
    let count = batch.spans.len();

    match exporter.export_spans(&batch).await {
        Ok(()) => debug!(count, "Exported span batch"),
        Err(e) => warn!(error = %e, count, "Failed to export span batch, dropping"),
    }
}

async fn flush_metrics(exporter: &dyn TelemetryExporter, resource: &Resource, metrics: &MetricsState) {
    let snapshot = MetricsSnapshot {
        resource: resource.clone(),
        exposition: metrics.render(),
    };

    if let Err(e) = exporter.export_metrics(&snapshot).await {
        warn!(error = %e, "Failed to export metrics snapshot, dropping");
    }
}
