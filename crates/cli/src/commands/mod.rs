//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.

use clap::{Parser, Subcommand};
use gscp_core::{Config, ConfigManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
pub mod cp;
pub mod ls;

/// gscp - copy bytes between Cloud Storage, local files and standard streams
///
/// Paths are `gs://bucket/key` for objects, `-` for standard input/output,
/// and anything else for a local file.
#[derive(Parser, Debug)]
#[command(name = "gscp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Abort remote operations after this many seconds (0 disables the limit)
    #[arg(long, global = true, env = "GSCP_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy one object or file (gs://, local path, or - for stdio)
    Cp(cp::CpArgs),

    /// List objects under a gs://bucket/prefix
    Ls(ls::LsArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Cp(args) => match load_config(cli.timeout, &output_config) {
            Ok(config) => cp::execute(args, &config, output_config).await,
            Err(code) => code,
        },
        Commands::Ls(args) => match load_config(cli.timeout, &output_config) {
            Ok(config) => ls::execute(args, &config, output_config).await,
            Err(code) => code,
        },
        Commands::Completions(args) => completions::execute(args),
    }
}

fn load_config(timeout: Option<u64>, output_config: &OutputConfig) -> Result<Config, ExitCode> {
    read_config(timeout).map_err(|e| {
        Formatter::new(output_config.clone()).error(&format!("Failed to load configuration: {e}"));
        ExitCode::from_error(&e)
    })
}

/// Load the config file, then apply environment and flag overrides
fn read_config(timeout: Option<u64>) -> gscp_core::Result<Config> {
    let mut config = ConfigManager::new()?.load()?;
    config.storage = config
        .storage
        .with_env_overrides(|name| std::env::var(name).ok());

    if let Some(secs) = timeout {
        config.defaults.timeout_secs = secs;
    }

    tracing::debug!(
        endpoint = %config.storage.endpoint,
        timeout_secs = config.defaults.timeout_secs,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_cp_requires_two_arguments() {
        let err = Cli::try_parse_from(["gscp", "cp", "only-source"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), ExitCode::UsageError.as_i32());
    }

    #[test]
    fn test_cp_rejects_extra_arguments() {
        assert!(Cli::try_parse_from(["gscp", "cp", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_cp_parses_stdio_and_dot() {
        let cli = Cli::try_parse_from(["gscp", "cp", "-", "."]).unwrap();
        let Commands::Cp(args) = cli.command else {
            panic!("expected cp");
        };
        assert_eq!(args.source, "-");
        assert_eq!(args.target, ".");
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "gscp",
            "ls",
            "gs://bucket/logs/",
            "--json",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.timeout, Some(30));
        assert!(matches!(cli.command, Commands::Ls(_)));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["gscp"]).is_err());
    }
}
