// src/longjob/resume.rs

//! Finish reporting on experiments that outlived their dispatch run.
//!
//! Meant to be run on a schedule: each invocation loads the persisted
//! records, re-checks their logs, appends any new results to the comment the
//! dispatch run left behind, and drops the records it has reported. Records
//! already reported are gone from the file, so re-running is harmless.

use tracing::{error, info};

use crate::config::ExperimentMarkers;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::logscan::{scan_experiment_log, ExperimentState};
use crate::longjob::store::{LongJobRecord, LongJobStore};
use crate::remote::{CommentId, RemoteService};

pub const ALL_COMPLETED_LINE: &str = "All experiments completed";

/// What one resume pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSummary {
    /// Records loaded from the state file.
    pub tracked: usize,
    /// Records reported and removed in this pass.
    pub completed: usize,
    /// Records left in the state file.
    pub remaining: usize,
    pub comments_edited: usize,
    pub state_file_removed: bool,
}

/// All records that report into the same comment.
struct CommentGroup {
    repo: String,
    request_number: u64,
    comment_id: CommentId,
    total: usize,
    done: Vec<usize>,
    text: String,
}

impl CommentGroup {
    fn matches(&self, record: &LongJobRecord) -> bool {
        self.repo == record.repo
            && self.request_number == record.request_number
            && self.comment_id == record.comment_id
    }
}

fn outcome_fragment(record: &LongJobRecord, state: ExperimentState, line: Option<&str>) -> String {
    let word = if state == ExperimentState::Failed {
        "Failed"
    } else {
        "Succeeded"
    };
    let mut text = format!("Experiment {word} on {}: {}\n", record.machine, record.experiment);
    if state == ExperimentState::Failed {
        if let Some(line) = line {
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

/// Run one resume pass over `store`.
pub async fn resume(
    store: &LongJobStore,
    remote: &dyn RemoteService,
    fs: &dyn FileSystem,
    markers: &ExperimentMarkers,
) -> Result<ResumeSummary> {
    let records = store.load()?;
    let mut summary = ResumeSummary {
        tracked: records.len(),
        ..ResumeSummary::default()
    };
    info!(experiments = records.len(), "experiments running");

    if records.is_empty() {
        return Ok(summary);
    }

    let mut groups: Vec<CommentGroup> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let pos = match groups.iter().position(|g| g.matches(record)) {
            Some(pos) => pos,
            None => {
                groups.push(CommentGroup {
                    repo: record.repo.clone(),
                    request_number: record.request_number,
                    comment_id: record.comment_id,
                    total: 0,
                    done: Vec::new(),
                    text: String::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[pos];
        group.total += 1;

        let status = match scan_experiment_log(fs, &record.log_path, markers) {
            Ok(status) => status,
            Err(e) => {
                // One unreadable log must not hold up the other comments.
                error!(
                    experiment = %record.experiment,
                    log = %record.log_path.display(),
                    error = %e,
                    "cannot read experiment log; keeping record"
                );
                continue;
            }
        };
        if status.state.is_done() {
            info!(
                experiment = %record.experiment,
                state = ?status.state,
                pr = record.request_number,
                "experiment finished"
            );
            group
                .text
                .push_str(&outcome_fragment(record, status.state, status.line.as_deref()));
            group.done.push(idx);
        }
    }

    let mut resolved = vec![false; records.len()];
    for group in groups.iter_mut().filter(|g| !g.done.is_empty()) {
        if group.done.len() == group.total {
            group.text.push_str(ALL_COMPLETED_LINE);
            group.text.push('\n');
        }

        match append_to_comment(remote, group).await {
            Ok(()) => {
                summary.comments_edited += 1;
                for &idx in &group.done {
                    resolved[idx] = true;
                }
            }
            Err(e) => {
                // Keep the records so the next pass reports them again.
                error!(
                    repo = %group.repo,
                    pr = group.request_number,
                    comment_id = group.comment_id,
                    error = %e,
                    "failed to update comment"
                );
            }
        }
    }

    summary.completed = resolved.iter().filter(|r| **r).count();
    info!(completed = summary.completed, "experiments completed");

    let remaining: Vec<LongJobRecord> = records
        .into_iter()
        .zip(resolved)
        .filter(|(_, done)| !done)
        .map(|(record, _)| record)
        .collect();
    summary.remaining = remaining.len();

    if remaining.is_empty() {
        store.remove()?;
        summary.state_file_removed = true;
    } else if summary.completed > 0 {
        store.save(&remaining)?;
    }

    Ok(summary)
}

async fn append_to_comment(remote: &dyn RemoteService, group: &CommentGroup) -> Result<()> {
    let mut body = remote.get_comment(&group.repo, group.comment_id).await?;
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str(&group.text);
    remote.edit_comment(&group.repo, group.comment_id, &body).await
}
