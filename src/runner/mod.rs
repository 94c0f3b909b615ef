// src/runner/mod.rs

//! Action runners: what a job actually does once its label is consumed.
//!
//! - [`build::BuildRunner`] handles `build` and `WE` (clone, externals,
//!   build, and for `WE` the end-to-end experiments).
//! - [`regression::RegressionRunner`] handles `rt` (clone, stage fix
//!   files, build, ctest).
//!
//! Runners add lines to the job's report; posting it is up to the caller
//! unless the runner says it already did.

pub mod build;
pub mod clone;
pub mod externals;
pub mod regression;

use async_trait::async_trait;

use crate::errors::Result;
use crate::job::{Job, JobContext};
use crate::remote::CommentId;
use crate::types::ActionKind;

pub use build::BuildRunner;
pub use regression::RegressionRunner;

/// How a runner finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOutcome {
    /// Report still needs posting.
    Completed,
    /// The report was already posted as this comment.
    Reported(CommentId),
}

#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(&self, job: &mut Job, ctx: &JobContext<'_>) -> Result<RunnerOutcome>;
}

pub fn runner_for(action: ActionKind) -> Box<dyn ActionRunner> {
    match action {
        ActionKind::Build => Box::new(BuildRunner { experiments: false }),
        ActionKind::EndToEnd => Box::new(BuildRunner { experiments: true }),
        ActionKind::Regression => Box::new(RegressionRunner),
    }
}
