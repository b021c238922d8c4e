use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use otel_demo::{config, init_tracing, server};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Serve => {
            let cfg = config::load_config(&args.config)?;
            init_tracing(&cfg.server.log_level, &cfg.server.log_format);
            server::start_server(cfg).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("otel-demo v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
