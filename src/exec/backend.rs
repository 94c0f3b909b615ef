// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! Jobs talk to a `CommandRunner` instead of spawning processes directly.
//! Production uses [`RealCommandRunner`]; tests provide a runner that records
//! the argument vectors and fakes the files a build script would leave
//! behind.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::command::{CommandOutput, CommandSpec};
use crate::exec::process::run_command;

/// Trait abstracting how external commands are executed.
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion.
    ///
    /// `Err` means the command could not be launched at all.
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>>;
}

/// Runs commands as real OS processes.
#[derive(Debug, Clone, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>> {
        Box::pin(run_command(spec))
    }
}
