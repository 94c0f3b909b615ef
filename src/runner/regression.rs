// src/runner/regression.rs

//! `rt`: build the data assimilation app and run its ctest regression suite.

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::{CiError, Result};
use crate::exec::CommandSpec;
use crate::job::{Job, JobContext};
use crate::logscan::scan_ctest_log;
use crate::runner::clone::{clone_checkout, timestamp, CloneSource};
use crate::runner::{ActionRunner, RunnerOutcome};

const BUILD_LOG: &str = "build.out";
const CTEST_LOG: &str = "gsi_ctest.out";
/// Executables a successful build installs, relative to the checkout.
const INSTALLED_EXECUTABLES: [&str; 2] = ["install/bin/gsi.x", "install/bin/enkf.x"];
/// Files staged from the work directory before building.
const STAGED_SCRIPTS: [&str; 2] = ["regression_var.sh", "regression_driver.sh"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionRunner;

impl RegressionRunner {
    /// Copy fix files and site-specific regression scripts into the checkout.
    fn staging_commands(workdir: &Path, checkout: &Path) -> Vec<CommandSpec> {
        let mut commands = vec![
            CommandSpec::new("cp", checkout)
                .arg("-r")
                .arg(workdir.join("vlab/GSI/fix/.").display().to_string())
                .arg("fix/"),
        ];
        for script in STAGED_SCRIPTS {
            commands.push(
                CommandSpec::new("cp", checkout)
                    .arg("-r")
                    .arg(workdir.join("gsia/regression").join(script).display().to_string())
                    .arg("regression/"),
            );
        }
        commands
    }
}

#[async_trait]
impl ActionRunner for RegressionRunner {
    async fn run(&self, job: &mut Job, ctx: &JobContext<'_>) -> Result<RunnerOutcome> {
        let workdir = job.machine.workdir.clone();
        let source = CloneSource {
            repo: job.request.head.repo_full_name.clone(),
            branch: job.request.head.branch.clone(),
        };
        let clone_dir = workdir
            .join("pr")
            .join(job.request.id.to_string())
            .join(timestamp());
        let checkout = clone_checkout(job, ctx, &source, &clone_dir).await?.path;

        info!("starting file copies");
        job.run_commands(ctx.runner, &Self::staging_commands(&workdir, &checkout))
            .await;

        let ush = checkout.join("ush");
        let build = CommandSpec::new("./build.sh", &ush)
            .arg("../")
            .env("config_path", workdir.display().to_string())
            .output_to(ush.join(BUILD_LOG));
        info!(dir = %ush.display(), "running build script");
        job.run_commands(ctx.runner, &[build]).await;

        let log_path = ush.join(BUILD_LOG);
        if !ctx.fs.is_file(&log_path) {
            error!(
                machine = %job.machine.name,
                compiler = %job.compiler,
                action = %job.action,
                "could not find build log"
            );
            return Err(CiError::LogNotFound(log_path));
        }
        let installed = INSTALLED_EXECUTABLES
            .iter()
            .all(|exe| ctx.fs.exists(&checkout.join(exe)));
        if !installed {
            info!("build failed");
            job.append("Build failed");
            return Err(CiError::BuildFailed);
        }
        job.append("Build was Successful");

        let ctest_dir = checkout.join("build/regression");
        let ctest = CommandSpec::new("ctest", &ctest_dir)
            .arg("--verbose")
            .output_to(ctest_dir.join(CTEST_LOG));
        info!("running regression tests");
        job.run_commands(ctx.runner, &[ctest]).await;

        let summary = scan_ctest_log(ctx.fs, &ctest_dir.join(CTEST_LOG))?;
        for line in summary.report_lines {
            job.append(line);
        }
        for name in summary.failed_tests {
            job.record_failed_test(name);
        }
        if !job.failed_tests().is_empty() {
            let line = format!("Failed tests: {}", job.failed_tests().join(", "));
            job.append(line);
        }
        Ok(RunnerOutcome::Completed)
    }
}
