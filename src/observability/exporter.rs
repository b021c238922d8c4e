//! Telemetry exporters
//!
//! The pipeline talks to the collector through the [`TelemetryExporter`]
//! trait: an OTLP-style HTTP JSON push for real deployments and a stdout
//! exporter for local development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::TelemetryConfig;
use crate::observability::span::FinishedSpan;

/// Resource attributes attached to every exported batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "service.name")]
    pub service_name: String,
    #[serde(rename = "service.version")]
    pub service_version: String,
    #[serde(rename = "deployment.environment")]
    pub environment: String,
}

impl Resource {
    pub fn from_config(telemetry: &TelemetryConfig) -> Self {
        Self {
            service_name: telemetry.service_name.clone(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: telemetry.environment.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpanBatch {
    pub resource: Resource,
    pub spans: Vec<FinishedSpan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub resource: Resource,
    /// Prometheus exposition text rendered at export time
    pub exposition: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("collector returned status {code}")]
    Status { code: u16 },
}

#[async_trait]
pub trait TelemetryExporter: Send + Sync {
    async fn export_spans(&self, batch: &SpanBatch) -> Result<(), ExportError>;
    async fn export_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), ExportError>;
}

/// Pushes JSON batches to a collector over HTTP
pub struct OtlpHttpExporter {
    client: reqwest::Client,
    traces_url: String,
    metrics_url: String,
}

impl OtlpHttpExporter {
    pub fn new(collector_url: &str) -> Self {
        let base = collector_url.trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            traces_url: format!("{}/v1/traces", base),
            metrics_url: format!("{}/v1/metrics", base),
        }
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<(), ExportError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Status {
                code: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryExporter for OtlpHttpExporter {
    async fn export_spans(&self, batch: &SpanBatch) -> Result<(), ExportError> {
        self.post(&self.traces_url, batch).await
    }

    async fn export_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), ExportError> {
        self.post(&self.metrics_url, snapshot).await
    }
}

/// Logs batches instead of shipping them; for local development
pub struct StdoutExporter;

#[async_trait]
impl TelemetryExporter for StdoutExporter {
    async fn export_spans(&self, batch: &SpanBatch) -> Result<(), ExportError> {
        for span in &batch.spans {
            info!(
                span_name = %span.name,
                trace_id = %span.trace_id,
                duration_ms = span.duration_ms,
                status = ?span.status,
                "Span"
            );
        }
        Ok(())
    }

    async fn export_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), ExportError> {
        info!(
            service = %snapshot.resource.service_name,
            bytes = snapshot.exposition.len(),
            "Metrics snapshot"
        );
        Ok(())
    }
}
