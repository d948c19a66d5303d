//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load()?;

    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    // CLI flag or env first, then the config file
    let api_key = cli.api_key.or_else(|| config.api_key.clone());

    let ctx = commands::Context {
        api_key,
        output_format,
        config,
    };

    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(&ctx, args).await,
        Commands::Parse(args) => commands::parse::execute(&ctx, &args).await,
        Commands::Config(args) => commands::config::execute(&ctx, args),
    }
}

/// `--verbose` forces debug; otherwise `RUST_LOG`, falling back to warn.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_forces_debug_filter() {
        assert_eq!(log_filter(true).to_string(), "debug");
    }
}
