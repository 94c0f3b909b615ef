// src/job/dispatch.rs

//! Turning open change requests into jobs and running them.

use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::job::context::JobContext;
use crate::job::label::match_label;
use crate::job::Job;
use crate::remote::RemoteService;

/// Counts for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub repos_scanned: usize,
    pub repos_failed: usize,
    pub jobs: usize,
}

/// Every (request, label) pair on this machine that names an approved
/// action becomes one job, in repo order, then request creation order, then
/// label order.
///
/// A repository whose requests cannot be listed is logged and skipped.
pub async fn collect_jobs(cfg: &ConfigFile, remote: &dyn RemoteService) -> (Vec<Job>, DispatchSummary) {
    let mut jobs = Vec::new();
    let mut summary = DispatchSummary::default();

    for repo in &cfg.repos {
        summary.repos_scanned += 1;
        let requests = match remote.list_open_requests(&repo.address, &repo.base).await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(repo = %repo.address, error = %e, "failed to list open requests; skipping repo");
                summary.repos_failed += 1;
                continue;
            }
        };
        debug!(repo = %repo.address, count = requests.len(), "open requests");

        for request in requests {
            for label in &request.labels {
                let Some(matched) = match_label(label, &cfg.machine.name, &cfg.approved_actions) else {
                    continue;
                };
                info!(repo = %repo.address, pr = request.number, label = %label, "queued job");
                jobs.push(Job::new(
                    request.clone(),
                    label.clone(),
                    repo.clone(),
                    cfg.machine.clone(),
                    matched,
                ));
            }
        }
    }

    summary.jobs = jobs.len();
    (jobs, summary)
}

/// Run `jobs` one after another. A job never aborts the ones after it.
pub async fn dispatch(jobs: Vec<Job>, ctx: &JobContext<'_>) {
    let total = jobs.len();
    for (i, mut job) in jobs.into_iter().enumerate() {
        info!(job = i + 1, total, label = %job.label, pr = job.request.number, "running job");
        job.run(ctx).await;
    }
}
