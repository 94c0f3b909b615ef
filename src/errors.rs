// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot find token file {0:?}")]
    TokenMissing(PathBuf),

    #[error("Token file {path:?} must not be readable by group or others (mode {mode:o})")]
    TokenPermissions { path: PathBuf, mode: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Remote API error: {status} - {message}")]
    RemoteError { status: u16, message: String },

    #[error("Could not find log {0:?}")]
    LogNotFound(PathBuf),

    #[error("Build failed")]
    BuildFailed,

    #[error("Could not find {0:?}")]
    ExternalsMissing(PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CiError>;
