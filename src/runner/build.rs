// src/runner/build.rs

//! `build` and `WE`: build the app, and for `WE` launch and watch the
//! end-to-end experiments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::{CiError, Result};
use crate::exec::CommandSpec;
use crate::job::{Job, JobContext};
use crate::logscan::{classify_build_log, generation_errors};
use crate::poll::ExperimentPoller;
use crate::runner::clone::{clone_checkout, is_workflow_request, resolve_clone_source, timestamp};
use crate::runner::externals::{pin_external, EXTERNALS_FILE};
use crate::runner::{ActionRunner, RunnerOutcome};

const BUILD_LOG: &str = "build.out";
const EXPERIMENT_SETUP_LOG: &str = "expt.out";
const WE2E_DIR: &str = "regional_workflow/tests/WE2E";
const WE2E_SCRIPT: &str = "setup_WE2E_tests.sh";
const GENERATION_LOG: &str = "regional_workflow/ush/log.generate_FV3LAM_wflow";
const EXPERIMENTS_DIR: &str = "expt_dirs";

#[derive(Debug, Clone, Copy)]
pub struct BuildRunner {
    /// Also run the end-to-end experiments after a successful build.
    pub experiments: bool,
}

impl BuildRunner {
    /// Clone, fix up `Externals.cfg` and fetch the externals.
    async fn prepare(&self, job: &mut Job, ctx: &JobContext<'_>) -> Result<(PathBuf, PathBuf)> {
        let source = resolve_clone_source(job, ctx.remote).await;
        let clone_dir = job
            .machine
            .workdir
            .join(job.request.id.to_string())
            .join(timestamp());
        let checkout = clone_checkout(job, ctx, &source, &clone_dir).await?;

        let externals = checkout.path.join(EXTERNALS_FILE);
        if !ctx.fs.is_file(&externals) {
            error!(path = %externals.display(), "could not find externals file");
            return Err(CiError::ExternalsMissing(externals));
        }

        if is_workflow_request(job) {
            let head = &job.request.head;
            let repo_url = format!("https://github.com/{}", head.repo_full_name);
            pin_external(ctx.fs, &checkout.path, &head.repo_name, &head.sha, &repo_url)?;
        }

        info!("starting manage externals");
        let fetch = CommandSpec::new("./manage_externals/checkout_externals", &checkout.path);
        job.run_commands(ctx.runner, &[fetch]).await;

        Ok((checkout.clone_dir, checkout.path))
    }

    async fn build(&self, job: &mut Job, ctx: &JobContext<'_>, checkout: &Path) -> Result<()> {
        let test_dir = checkout.join("test");
        let machine = job.machine.name.clone();
        // The machine is passed twice so older build scripts expecting one
        // argument and newer ones expecting two both accept it.
        let build = CommandSpec::new("./build.sh", &test_dir)
            .args([machine.as_str(), machine.as_str()])
            .env("SR_WX_APP_TOP_DIR", checkout.display().to_string())
            .output_to(test_dir.join(BUILD_LOG));
        info!(dir = %test_dir.display(), "running test build script");
        job.run_commands(ctx.runner, &[build]).await;

        let log_path = test_dir.join(BUILD_LOG);
        let log = classify_build_log(ctx.fs, &log_path).inspect_err(|_| {
            error!(
                machine = %job.machine.name,
                compiler = %job.compiler,
                action = %job.action,
                "could not find build log"
            );
        })?;
        for line in log.fail_lines {
            job.append(line);
        }
        if !log.succeeded {
            info!("build failed");
            job.append("Build failed");
            return Err(CiError::BuildFailed);
        }
        info!("build was successful");
        job.append("Build was Successful");
        Ok(())
    }

    async fn run_experiments(
        &self,
        job: &mut Job,
        ctx: &JobContext<'_>,
        clone_dir: &Path,
        checkout: &Path,
    ) -> Result<RunnerOutcome> {
        let script_dir = checkout.join(WE2E_DIR);
        let script = script_dir.join(WE2E_SCRIPT);
        if !ctx.fs.is_file(&script) {
            job.append(format!("Script {} does not exist in repo", script.display()));
            job.append("Cannot run WE2E tests");
            return Ok(RunnerOutcome::Completed);
        }

        let setup = CommandSpec::new(format!("./{WE2E_SCRIPT}"), &script_dir)
            .args([job.machine.name.as_str(), job.machine.hpc_acc.as_str()])
            .output_to(script_dir.join(EXPERIMENT_SETUP_LOG));
        info!("running end to end test");
        job.run_commands(ctx.runner, &[setup]).await;

        let base = clone_dir.join(EXPERIMENTS_DIR);
        let started = ctx.fs.is_dir(&base) && !ctx.fs.read_dir(&base)?.is_empty();
        if !started {
            let lines = generation_errors(ctx.fs, &checkout.join(GENERATION_LOG))?;
            if !lines.is_empty() {
                info!("generating workflow failed");
                job.append("Generating Workflow Failed");
                for line in lines {
                    job.append(line);
                }
            }
            return Ok(RunnerOutcome::Completed);
        }

        job.append("Rocoto jobs started");
        let poller = ExperimentPoller::from_settings(ctx.poll);
        let outcome = poller.poll(job, ctx, &base).await?;
        Ok(match outcome.comment_id {
            Some(id) => RunnerOutcome::Reported(id),
            None => RunnerOutcome::Completed,
        })
    }
}

#[async_trait]
impl ActionRunner for BuildRunner {
    async fn run(&self, job: &mut Job, ctx: &JobContext<'_>) -> Result<RunnerOutcome> {
        let (clone_dir, checkout) = self.prepare(job, ctx).await?;
        self.build(job, ctx, &checkout).await?;

        if !self.experiments {
            return Ok(RunnerOutcome::Completed);
        }
        self.run_experiments(job, ctx, &clone_dir, &checkout).await
    }
}
