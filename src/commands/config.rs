use anyhow::Result;
use colored::Colorize;
use otel_demo::config;
use std::path::Path;
use tracing::info;

/// Execute the config show command
pub fn show(path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(path)?;

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&cfg)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate(path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = config::load_config(path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Service Name: {}", cfg.telemetry.service_name);
    println!("  Environment: {}", cfg.telemetry.environment);
    println!("  Listen Address: {}:{}", cfg.server.host, cfg.server.port);
    println!("  Collector: {}", cfg.telemetry.collector_url);
    println!("  Exporter: {}", cfg.telemetry.exporter);

    Ok(())
}
