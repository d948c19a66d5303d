//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Interview integrity monitor
///
/// Analyze candidate frames and inspect how raw model answers are scored.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Analysis service API key
    #[arg(short = 'k', long, env = "VIGIL_ANALYSIS_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one frame image
    Analyze(AnalyzeArgs),

    /// Run a saved raw model answer through the parsing chain
    Parse(ParseArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file (or base64 text with --base64)
    pub image: PathBuf,

    /// Session id to attribute the record to
    #[arg(short, long, default_value = "cli")]
    pub session: String,

    /// Treat the file as a base64 frame (plain or data: URL)
    #[arg(long)]
    pub base64: bool,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File holding the raw answer ("-" for stdin)
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let cli = Cli::try_parse_from(["vigil", "analyze", "frame.jpg"]).unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.session, "cli");
                assert!(!args.base64);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_output_after_subcommand() {
        let cli = Cli::try_parse_from(["vigil", "parse", "-", "--output", "yaml"]).unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Yaml));
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["vigil", "config", "path", "-v"]).unwrap();
        assert!(cli.verbose);
        let cli = Cli::try_parse_from(["vigil", "config", "path"]).unwrap();
        assert!(!cli.verbose);
    }
}
