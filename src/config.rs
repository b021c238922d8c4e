use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_collector_url")]
    pub collector_url: String,
    #[serde(default = "default_export_interval_secs")]
    pub export_interval_secs: u64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Which exporter ships telemetry: "otlp" or "stdout"
    #[serde(default = "default_exporter")]
    pub exporter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatencyConfig {
    #[serde(default = "default_latency_enabled")]
    pub enabled: bool,
    /// Upper bound for the random backend delay on list endpoints
    #[serde(default = "default_list_max_ms")]
    pub list_max_ms: u64,
    /// Fixed delay for the timeout simulation endpoint
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_service_name() -> String {
    "otel-demo".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_collector_url() -> String {
    "http://127.0.0.1:4318".to_string()
}

fn default_export_interval_secs() -> u64 {
    10
}

fn default_max_batch_size() -> usize {
    512
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_exporter() -> String {
    "otlp".to_string()
}

fn default_latency_enabled() -> bool {
    true
}

fn default_list_max_ms() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            collector_url: default_collector_url(),
            export_interval_secs: default_export_interval_secs(),
            max_batch_size: default_max_batch_size(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            exporter: default_exporter(),
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: default_latency_enabled(),
            list_max_ms: default_list_max_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Load configuration from an optional TOML file plus environment variables
///
/// Every field has a default, so the service runs with no file and no
/// environment at all. Precedence: defaults < file < `OTEL_DEMO__*` env <
/// well-known OpenTelemetry/platform overrides.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("OTEL_DEMO").separator("__"))
        .build()?;

    let mut cfg: Config = config.try_deserialize()?;
    apply_well_known_env(&mut cfg)?;
    validate_config(&cfg)?;

    Ok(cfg)
}

/// Apply the conventional override variables recognized by the original
/// deployment tooling (they predate the `OTEL_DEMO__` prefix scheme).
fn apply_well_known_env(cfg: &mut Config) -> anyhow::Result<()> {
    if let Ok(name) = std::env::var("OTEL_SERVICE_NAME") {
        if !name.is_empty() {
            cfg.telemetry.service_name = name;
        }
    }
    if let Ok(url) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        if !url.is_empty() {
            cfg.telemetry.collector_url = url;
        }
    }
    if let Ok(port) = std::env::var("PORT") {
        cfg.server.port = port
            .parse()
            .with_context(|| format!("Invalid PORT value: {}", port))?;
    }
    Ok(())
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.telemetry.service_name.is_empty() {
        anyhow::bail!("Telemetry service name cannot be empty");
    }

    if cfg.telemetry.export_interval_secs == 0 {
        anyhow::bail!("Telemetry export interval must be at least 1 second");
    }

    if cfg.telemetry.max_batch_size == 0 {
        anyhow::bail!("Telemetry max batch size must be at least 1");
    }

    match cfg.telemetry.exporter.as_str() {
        "otlp" | "stdout" => {}
        other => anyhow::bail!("Unknown telemetry exporter: {}", other),
    }

    Ok(())
}
