//! Metric registry and recording helpers
//!
//! Instruments are registered exactly once at startup through
//! [`MetricRegistry`]; registering the same name twice is a fatal
//! configuration error. Recordings go through the installed Prometheus
//! recorder, which accumulates atomically per label-set bucket.

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Label, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;

pub const REQUESTS_TOTAL: &str = "business_requests_total";
pub const OPERATION_DURATION_MS: &str = "business_operation_duration_ms";
pub const REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";
pub const PRODUCT_INVENTORY: &str = "business_product_inventory";

/// Install the Prometheus recorder for the whole process
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

type GaugeCallback = Box<dyn Fn() + Send + Sync>;

/// Tracks registered instrument names and pull-based gauge callbacks
///
/// Built mutably during startup, then frozen behind an `Arc` for the rest of
/// the process lifetime.
pub struct MetricRegistry {
    names: HashSet<String>,
    gauge_callbacks: Vec<GaugeCallback>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            names: HashSet::new(),
            gauge_callbacks: Vec::new(),
        }
    }

    /// Register a monotonic counter
    pub fn register_counter(&mut self, name: &str, description: &str) -> Result<()> {
        self.claim(name)?;
        describe_counter!(name.to_string(), description.to_string());
        Ok(())
    }

    /// Register a bucketed distribution with an explicit unit
    pub fn register_histogram(&mut self, name: &str, description: &str, unit: Unit) -> Result<()> {
        self.claim(name)?;
        describe_histogram!(name.to_string(), unit, description.to_string());
        Ok(())
    }

    /// Register a signed additive counter (modeled as a gauge family)
    pub fn register_up_down_counter(&mut self, name: &str, description: &str) -> Result<()> {
        self.claim(name)?;
        describe_gauge!(name.to_string(), description.to_string());
        Ok(())
    }

    /// Register a pull-based gauge
    ///
    /// The callback runs before every scrape and every export tick; it should
    /// emit its observations by setting gauge values.
    pub fn register_observable_gauge<F>(&mut self, name: &str, description: &str, callback: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.claim(name)?;
        describe_gauge!(name.to_string(), description.to_string());
        self.gauge_callbacks.push(Box::new(callback));
        Ok(())
    }

    /// Run all observable-gauge callbacks
    pub fn observe_gauges(&self) {
        for callback in &self.gauge_callbacks {
            callback();
        }
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            anyhow::bail!("Metric instrument '{}' registered twice", name);
        }
        Ok(())
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrape-side state shared by the `/metrics` handler and the export pipeline
#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub registry: Arc<MetricRegistry>,
}

impl MetricsState {
    /// Render the Prometheus exposition text, running gauge callbacks first
    pub fn render(&self) -> String {
        self.registry.observe_gauges();
        self.handle.render()
    }
}

/// Register the service's instruments
///
/// Called once from server startup; the product inventory gauge observes the
/// read-only store on every scrape.
pub fn register_instruments(registry: &mut MetricRegistry, store: Arc<Store>) -> Result<()> {
    registry.register_counter(REQUESTS_TOTAL, "Total number of business requests")?;
    registry.register_histogram(
        OPERATION_DURATION_MS,
        "Duration of business operations in milliseconds",
        Unit::Milliseconds,
    )?;
    registry.register_up_down_counter(REQUESTS_IN_FLIGHT, "Number of requests currently being handled")?;
    registry.register_observable_gauge(
        PRODUCT_INVENTORY,
        "Current product inventory levels",
        move || {
            for product in store.products() {
                gauge!(
                    PRODUCT_INVENTORY,
                    "product_id" => product.id.to_string(),
                    "product_name" => product.name.clone(),
                )
                .set(product.stock as f64);
            }
        },
    )?;

    Ok(())
}

/// Fixed label vocabulary for request counters and operation histograms
///
/// The only setters are the four documented dimensions, so recordings cannot
/// drift from the vocabulary downstream aggregation depends on.
#[derive(Debug, Clone, Default)]
pub struct RequestLabels {
    endpoint: Option<String>,
    method: Option<String>,
    status: Option<String>,
    operation: Option<String>,
}

impl RequestLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    fn into_labels(self) -> Vec<Label> {
        let mut labels = Vec::with_capacity(4);
        if let Some(endpoint) = self.endpoint {
            labels.push(Label::new("endpoint", endpoint));
        }
        if let Some(method) = self.method {
            labels.push(Label::new("method", method));
        }
        if let Some(status) = self.status {
            labels.push(Label::new("status", status));
        }
        if let Some(operation) = self.operation {
            labels.push(Label::new("operation", operation));
        }
        labels
    }
}

/// Record one business request
pub fn record_request(labels: RequestLabels) {
    counter!(REQUESTS_TOTAL, labels.into_labels()).increment(1);
}

/// Record the wall-clock duration of one business operation
pub fn record_operation_duration(operation: &str, elapsed: Duration) {
    histogram!(
        OPERATION_DURATION_MS,
        RequestLabels::new().operation(operation).into_labels()
    )
    .record(elapsed.as_secs_f64() * 1000.0);
}

/// Track a request entering its handler
pub fn in_flight_add(endpoint: &str) {
    gauge!(REQUESTS_IN_FLIGHT, "endpoint" => endpoint.to_string()).increment(1.0);
}

/// Track a request leaving its handler
pub fn in_flight_sub(endpoint: &str) {
    gauge!(REQUESTS_IN_FLIGHT, "endpoint" => endpoint.to_string()).decrement(1.0);
}
