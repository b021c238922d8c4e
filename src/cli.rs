use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "otel-demo", version, about = "Instrumented demo HTTP service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "otel-demo.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the demo service (default)
    Serve,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl Cli {
    /// Default to `serve` when no subcommand is given
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["otel-demo"]);
        assert!(matches!(cli.get_command(), Commands::Serve));
        assert_eq!(cli.config, PathBuf::from("otel-demo.toml"));
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::parse_from(["otel-demo", "config", "validate"]);
        assert!(matches!(
            cli.get_command(),
            Commands::Config {
                action: ConfigCommands::Validate
            }
        ));
    }

    #[test]
    fn test_custom_config_path() {
        let cli = Cli::parse_from(["otel-demo", "--config", "/etc/demo.toml", "serve"]);
        assert_eq!(cli.config, PathBuf::from("/etc/demo.toml"));
    }
}
