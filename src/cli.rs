// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `ci-auto`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ci-auto",
    version,
    about = "Run CI jobs requested through pull request labels on an HPC machine.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `CiAuto.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CI_AUTO_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Write logs to a timestamped file in this directory instead of stderr.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Poll open pull requests and run every job their labels ask for.
    Dispatch {
        /// List the jobs that would run without touching labels or running
        /// anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check experiments left running by earlier dispatch runs and update
    /// their comments.
    Resume,
}

impl Command {
    /// Prefix of the log file name when logging to a directory.
    pub fn log_file_prefix(&self) -> &'static str {
        match self {
            Command::Dispatch { .. } => "ci_auto",
            Command::Resume => "ci_long",
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_defaults() {
        let args = CliArgs::try_parse_from(["ci-auto", "dispatch"]).unwrap();
        assert_eq!(args.config, PathBuf::from("CiAuto.toml"));
        assert!(args.log_dir.is_none());
        assert!(matches!(args.command, Command::Dispatch { dry_run: false }));
    }

    #[test]
    fn resume_with_log_dir() {
        let args = CliArgs::try_parse_from([
            "ci-auto",
            "--config",
            "/etc/ci.toml",
            "--log-level",
            "debug",
            "--log-dir",
            "/var/log/ci",
            "resume",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/ci.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert_eq!(args.command.log_file_prefix(), "ci_long");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["ci-auto"]).is_err());
    }
}
