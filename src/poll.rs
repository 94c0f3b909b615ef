// src/poll.rs

//! Bounded polling of end-to-end experiments.
//!
//! Experiments are directories under one base directory, each writing
//! `log/FV3LAM_wflow.log`. More may appear while we wait. Whatever has not
//! finished when the cycles run out is handed to the long-job store and
//! picked up later by `resume`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::{ExperimentMarkers, PollSettings};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::job::{Job, JobContext};
use crate::logscan::{scan_experiment_log, ExperimentState};
use crate::longjob::LongJobRecord;
use crate::remote::CommentId;

/// Log of one experiment, relative to its directory.
pub const EXPERIMENT_LOG: &str = "log/FV3LAM_wflow.log";

pub fn experiment_log(base: &Path, name: &str) -> PathBuf {
    base.join(name).join(EXPERIMENT_LOG)
}

#[derive(Debug, Clone)]
pub struct ExperimentPoller {
    pub cycles: u32,
    pub delay: Duration,
    pub markers: ExperimentMarkers,
}

/// What polling observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Experiments that reached a terminal state, in the order they did.
    pub finished: Vec<(String, ExperimentState)>,
    /// Experiments handed to long-term tracking, sorted.
    pub pending: Vec<String>,
    /// Set when the job's report was posted because experiments remain.
    pub comment_id: Option<CommentId>,
}

/// Names of the experiment directories under `base`.
fn list_experiments(fs: &dyn FileSystem, base: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs.read_dir(base)? {
        if !fs.is_dir(&entry) {
            continue;
        }
        if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

impl ExperimentPoller {
    pub fn from_settings(settings: &PollSettings) -> Self {
        Self {
            cycles: settings.cycles,
            delay: settings.delay,
            markers: settings.markers.clone(),
        }
    }

    /// Poll the experiments under `base` and report on them.
    ///
    /// Each experiment is reported at most once. If any are still running
    /// after the last cycle the job's report is posted here and one record
    /// per outstanding experiment is merged into the long-job store.
    pub async fn poll(&self, job: &mut Job, ctx: &JobContext<'_>, base: &Path) -> Result<PollOutcome> {
        let mut outcome = self.watch(ctx.fs, job, base).await?;
        if outcome.pending.is_empty() {
            return Ok(outcome);
        }

        // If this post fails no records are written, so the line must not
        // stay in the report that `Job::run` posts next.
        let tracking = format!(
            "Long term tracking will be done on {} experiments",
            outcome.pending.len()
        );
        let comment_id = job.flush_report_with(ctx.remote, tracking).await?;
        outcome.comment_id = Some(comment_id);

        let records: Vec<LongJobRecord> = outcome
            .pending
            .iter()
            .map(|name| LongJobRecord {
                log_path: experiment_log(base, name),
                experiment: name.clone(),
                machine: job.machine.name.clone(),
                repo: job.request.repo.clone(),
                request_number: job.request.number,
                comment_id,
            })
            .collect();

        // The comment is already out; losing the records only loses the
        // follow-up edits, so this must not turn into a second comment.
        if let Err(e) = ctx.store.merge(records) {
            error!(path = %ctx.store.path().display(), error = %e, "failed to persist long-job records");
        }

        Ok(outcome)
    }

    /// Run the wait cycles, re-listing `base` each time.
    ///
    /// Stops early once every known experiment has finished. Finished
    /// experiments are appended to the job's report the first time only.
    async fn watch(&self, fs: &dyn FileSystem, job: &mut Job, base: &Path) -> Result<PollOutcome> {
        // name -> None while outstanding, Some(state) once done.
        let mut known: BTreeMap<String, Option<ExperimentState>> = BTreeMap::new();
        for name in list_experiments(fs, base)? {
            known.insert(name, None);
        }

        let mut outcome = PollOutcome::default();
        let mut cycles_run = 0;
        while cycles_run < self.cycles && known.values().any(Option::is_none) {
            tokio::time::sleep(self.delay).await;
            cycles_run += 1;

            for name in list_experiments(fs, base)? {
                known.entry(name).or_insert(None);
            }
            debug!(cycle = cycles_run, experiments = ?known.keys().collect::<Vec<_>>(), "experiment dirs");

            for (name, state) in known.iter_mut() {
                if state.is_some() {
                    continue;
                }
                let status = scan_experiment_log(fs, &experiment_log(base, name), &self.markers)?;
                let verb = match status.state {
                    ExperimentState::Succeeded => "done",
                    ExperimentState::Failed => "failed",
                    ExperimentState::Pending | ExperimentState::Running => continue,
                };
                info!(experiment = %name, state = ?status.state, "experiment {verb}");
                job.append(format!("Experiment {verb}: {name}"));
                if let Some(line) = status.line {
                    job.append(line);
                }
                *state = Some(status.state);
                outcome.finished.push((name.clone(), status.state));
            }
        }

        outcome.pending = known
            .iter()
            .filter(|(_, state)| state.is_none())
            .map(|(name, _)| name.clone())
            .collect();
        info!(
            cycles = cycles_run,
            done = outcome.finished.len(),
            total = known.len(),
            "wait cycles completed"
        );

        Ok(outcome)
    }
}
