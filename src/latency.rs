//! Injectable artificial latency
//!
//! List endpoints model a variable-latency backend with a bounded random
//! delay; the timeout simulation uses a long fixed delay. Both come from this
//! one source so tests can disable them and run deterministically.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LatencyConfig;

#[derive(Debug, Clone)]
pub struct Latency {
    enabled: bool,
    list_max_ms: u64,
    timeout_ms: u64,
}

impl Latency {
    pub fn from_config(config: &LatencyConfig) -> Self {
        Self {
            enabled: config.enabled,
            list_max_ms: config.list_max_ms,
            timeout_ms: config.timeout_ms,
        }
    }

    /// No delays at all; for tests
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            list_max_ms: 0,
            timeout_ms: 0,
        }
    }

    /// Random backend delay, uniform in `0..list_max_ms`
    pub async fn backend_delay(&self) {
        if !self.enabled || self.list_max_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(0..self.list_max_ms);
        sleep(Duration::from_millis(ms)).await;
    }

    /// Fixed delay long enough to trip client timeouts
    pub async fn timeout_delay(&self) {
        if !self.enabled {
            return;
        }
        sleep(Duration::from_millis(self.timeout_ms)).await;
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::from_config(&LatencyConfig::default())
    }
}
