// src/config/mod.rs

//! Configuration loading and validation for ci-auto.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate machine, repository, action and polling settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ActionsSection, ConfigFile, ExperimentMarkers, GithubSection, MachineSection, PollSection,
    PollSettings, RawConfigFile, RepoConfig,
};
