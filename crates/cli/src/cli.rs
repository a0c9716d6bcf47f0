//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Media Sync - keep a follower timeline phase-locked to a master timeline
#[derive(Parser, Debug)]
#[command(
    name = "media-sync",
    author,
    version,
    about = "Media timeline synchronization engine",
    long_about = "Drives a media synchronization engine against a scripted master/follower \n\
                  scenario: stalls, buffer starvation, speed changes and recalibrations, \n\
                  reporting every correction and sync event."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MEDIA_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MEDIA_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a synchronization session against the configured scenario
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "media-sync.toml",
        env = "MEDIA_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Override engine tolerance (milliseconds)
    #[arg(long, env = "MEDIA_SYNC_TOLERANCE_MS")]
    pub tolerance_ms: Option<f64>,

    /// Override watchdog interval (milliseconds)
    #[arg(long, env = "MEDIA_SYNC_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Override scenario length (milliseconds)
    #[arg(long, env = "MEDIA_SYNC_DURATION_MS")]
    pub duration_ms: Option<u64>,

    /// Override follower clock skew (1.0 = no skew)
    #[arg(long, env = "MEDIA_SYNC_FOLLOWER_SKEW")]
    pub follower_skew: Option<f64>,

    /// Session timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "MEDIA_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running the session
    #[arg(long)]
    pub dry_run: bool,

    /// Print final engine statistics as JSON
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MEDIA_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "media-sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "media-sync.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the scripted event timeline
    #[arg(long)]
    pub events: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "media-sync",
            "run",
            "--config",
            "session.toml",
            "--tolerance-ms",
            "25",
            "--poll-interval-ms",
            "500",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("session.toml"));
                assert_eq!(args.tolerance_ms, Some(25.0));
                assert_eq!(args.poll_interval_ms, Some(500));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["media-sync", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
