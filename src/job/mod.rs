// src/job/mod.rs

//! One CI job: a matched (change request, label, action) triple.
//!
//! A `Job` owns the text of the comment it will post and the list of failed
//! tests. It is created by [`dispatch::collect_jobs`], run once with
//! [`Job::run`], and dropped. Nothing a job does can fail the dispatch run:
//! errors end up in the job's comment and in the process log.

pub mod context;
pub mod dispatch;
pub mod label;

use std::fmt::Display;

use tracing::{error, info, warn};

use crate::config::{MachineSection, RepoConfig};
use crate::errors::{CiError, Result};
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};
use crate::remote::{ChangeRequest, CommentId, RemoteService};
use crate::runner::{runner_for, RunnerOutcome};
use crate::types::{ActionKind, Compiler};

pub use context::JobContext;
pub use dispatch::{collect_jobs, dispatch, DispatchSummary};
pub use label::{label_for, match_label, LabelMatch};

pub const RETRY_HINT: &str = "If test failed, please make changes and add the following label back:";

#[derive(Debug, Clone)]
pub struct Job {
    pub request: ChangeRequest,
    /// The label that triggered this job, exactly as it appears remotely.
    pub label: String,
    pub repo: RepoConfig,
    pub machine: MachineSection,
    pub compiler: Compiler,
    pub action: ActionKind,
    report: Vec<String>,
    failed_tests: Vec<String>,
}

impl Job {
    pub fn new(
        request: ChangeRequest,
        label: impl Into<String>,
        repo: RepoConfig,
        machine: MachineSection,
        matched: LabelMatch,
    ) -> Self {
        Self {
            request,
            label: label.into(),
            repo,
            machine,
            compiler: matched.compiler,
            action: matched.action,
            report: Vec::new(),
            failed_tests: Vec::new(),
        }
    }

    /// Report lines accumulated so far.
    pub fn report(&self) -> &[String] {
        &self.report
    }

    pub fn failed_tests(&self) -> &[String] {
        &self.failed_tests
    }

    pub fn append(&mut self, line: impl Into<String>) {
        self.report.push(line.into());
    }

    pub fn record_failed_test(&mut self, name: impl Into<String>) {
        self.failed_tests.push(name.into());
    }

    /// Label to re-apply to run this job again.
    pub fn retry_label(&self) -> String {
        label_for(&self.machine.name, self.compiler, self.action)
    }

    /// Whether the triggering label is still on the request.
    ///
    /// Listing requests and running jobs is not atomic: someone may have
    /// removed the label, or an earlier job for the same label may already
    /// have consumed it.
    pub async fn check_label_still_present(&self, remote: &dyn RemoteService) -> Result<bool> {
        let labels = remote
            .list_labels(&self.request.repo, self.request.number)
            .await?;
        Ok(labels.iter().any(|l| l == &self.label))
    }

    pub async fn remove_label(&self, remote: &dyn RemoteService) -> Result<()> {
        info!(label = %self.label, pr = self.request.number, "removing label");
        remote
            .remove_label(&self.request.repo, self.request.number, &self.label)
            .await
    }

    /// Run `commands` one after another and return how many failed.
    ///
    /// A command that cannot be started or exits non-zero is recorded with
    /// [`Job::report_failure`]; the remaining commands still run. Callers
    /// decide from the logs the commands leave behind whether to carry on.
    pub async fn run_commands(&self, runner: &dyn CommandRunner, commands: &[CommandSpec]) -> usize {
        let mut failures = 0;
        for spec in commands {
            match runner.run(spec).await {
                Err(e) => {
                    self.report_failure(&format!("launching `{spec}`"), &e, None);
                    failures += 1;
                }
                Ok(output) if !output.success() => {
                    let status = match output.exit_code {
                        Some(code) => format!("exit code {code}"),
                        None => "terminated by signal".to_string(),
                    };
                    self.report_failure(&format!("command `{spec}`"), &status, Some(&output));
                    failures += 1;
                }
                Ok(_) => {
                    info!(cmd = %spec, "finished running command");
                }
            }
        }
        failures
    }

    /// Log a failure for later diagnosis. Does not touch the report.
    pub fn report_failure(&self, context: &str, err: &dyn Display, output: Option<&CommandOutput>) {
        error!(
            label = %self.label,
            pr = self.request.number,
            context,
            error = %err,
            "{context} FAILED"
        );
        if let Some(output) = output {
            error!(
                label = %self.label,
                stdout = %output.stdout.trim_end(),
                stderr = %output.stderr.trim_end(),
                "captured output"
            );
        }
    }

    /// Post the report as one comment, ending with the label to re-apply.
    ///
    /// The report buffer is left as it was, so a failed post can be retried
    /// with more lines appended.
    pub async fn flush_report(&self, remote: &dyn RemoteService) -> Result<CommentId> {
        self.post_report(remote, None).await
    }

    /// Post the report with `trailer` after the accumulated lines.
    ///
    /// `trailer` is appended to the buffer only once the comment exists.
    pub async fn flush_report_with(&mut self, remote: &dyn RemoteService, trailer: String) -> Result<CommentId> {
        let id = self.post_report(remote, Some(&trailer)).await?;
        self.append(trailer);
        Ok(id)
    }

    async fn post_report(&self, remote: &dyn RemoteService, trailer: Option<&str>) -> Result<CommentId> {
        let retry = self.retry_label();
        let lines: Vec<&str> = self
            .report
            .iter()
            .map(String::as_str)
            .chain(trailer)
            .chain([RETRY_HINT, retry.as_str()])
            .collect();
        let mut body = lines.join("\n");
        body.push('\n');
        info!(pr = self.request.number, lines = lines.len(), "sending comment text");

        remote
            .create_comment(&self.request.repo, self.request.number, &body)
            .await
    }

    /// Run the job start to finish.
    ///
    /// If the label has gone the job was superseded and nothing is posted.
    /// Otherwise exactly one comment is posted for the run (by the poller if
    /// experiments are still pending, here in every other case).
    pub async fn run(&mut self, ctx: &JobContext<'_>) {
        info!(label = %self.label, pr = self.request.number, repo = %self.request.repo, "starting job");
        self.append(format!("Machine: {}", self.machine.name));
        self.append(format!("Compiler: {}", self.compiler));
        self.append(format!("Job: {}", self.action));

        match self.check_label_still_present(ctx.remote).await {
            Ok(true) => {}
            Ok(false) => {
                info!(label = %self.label, pr = self.request.number, "cannot find label; skipping");
                return;
            }
            Err(e) => {
                self.report_failure("checking label", &e, None);
                return;
            }
        }

        let result = match self.remove_label(ctx.remote).await {
            Ok(()) => runner_for(self.action).run(self, ctx).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(RunnerOutcome::Reported(comment_id)) => {
                info!(pr = self.request.number, comment_id, "job reported; experiments pending");
                return;
            }
            Ok(RunnerOutcome::Completed) => {}
            Err(CiError::BuildFailed) => {
                // The runner already put the failing lines in the report.
                self.report_failure("build", &CiError::BuildFailed, None);
            }
            Err(e) => {
                self.report_failure("run()", &e, None);
                self.append(format!("Job failed: {e}"));
            }
        }

        match self.flush_report(ctx.remote).await {
            Ok(comment_id) => info!(pr = self.request.number, comment_id, "job finished"),
            Err(e) => warn!(pr = self.request.number, error = %e, "could not post job comment"),
        }
    }
}
