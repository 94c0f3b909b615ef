// src/logging.rs

//! Logging setup for `ci-auto` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CI_AUTO_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR unless a log directory is given, in which case each
//! invocation writes its own `<prefix>_<YYYYmmddHHMMSS>.log` there. The bot
//! is usually run from cron, so the per-run file is what gets read.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup. Returns the log file path when logging to
/// a directory.
pub fn init_logging(
    cli_level: Option<LogLevel>,
    log_dir: Option<&Path>,
    prefix: &str,
) -> Result<Option<PathBuf>> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("CI_AUTO_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    let builder = fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    match log_dir {
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("creating log dir {:?}", dir))?;
            let path = dir.join(log_file_name(prefix, &Local::now().format("%Y%m%d%H%M%S").to_string()));
            let file = File::create(&path).with_context(|| format!("creating log file {:?}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
            Ok(Some(path))
        }
    }
}

fn log_file_name(prefix: &str, timestamp: &str) -> String {
    format!("{prefix}_{timestamp}.log")
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
