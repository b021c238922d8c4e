use std::sync::Arc;

use crate::latency::Latency;
use crate::metrics::MetricsState;
use crate::observability::SpanEmitter;
use crate::store::Store;

pub mod errors;
pub mod health;
pub mod metrics_handler;
pub mod products;
pub mod users;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub emitter: SpanEmitter,
    pub latency: Latency,
    pub metrics: MetricsState,
}
