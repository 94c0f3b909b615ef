// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes a command as an argument vector plus working
//!   directory, per-command environment and optional output file.
//! - [`process`] runs one command with `tokio::process::Command`.
//! - [`backend`] provides the `CommandRunner` trait and the
//!   `RealCommandRunner` used in production, which tests replace with a fake.

pub mod backend;
pub mod command;
pub mod process;

pub use backend::{CommandRunner, RealCommandRunner};
pub use command::{CommandOutput, CommandSpec};
