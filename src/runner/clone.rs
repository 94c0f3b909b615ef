// src/runner/clone.rs

//! Cloning the code a change request proposes.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::CommandSpec;
use crate::job::{Job, JobContext};
use crate::remote::RemoteService;

/// Repository and branch to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneSource {
    /// `owner/name`.
    pub repo: String,
    pub branch: String,
}

/// Where a job's code landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    /// Per-run directory the clone was made in.
    pub clone_dir: PathBuf,
    /// The cloned app repository inside `clone_dir`.
    pub path: PathBuf,
}

/// Whether the request comes from a workflow repository rather than the app.
pub fn is_workflow_request(job: &Job) -> bool {
    job.request.head.repo_name != job.repo.app_name()
}

/// Pick what to clone for the build flavour.
///
/// App requests clone the head branch of the head repository. Workflow
/// requests are built inside the app: the author's fork of the app is used
/// if it has a branch of the same name, else the configured app branch.
pub async fn resolve_clone_source(job: &Job, remote: &dyn RemoteService) -> CloneSource {
    let head = &job.request.head;
    if !is_workflow_request(job) {
        return CloneSource {
            repo: head.repo_full_name.clone(),
            branch: head.branch.clone(),
        };
    }

    let fork = format!("{}/{}", head.user_login, job.repo.app_name());
    let has_branch = match remote.list_branches(&fork).await {
        Ok(branches) => branches.iter().any(|b| b == &head.branch),
        Err(e) => {
            warn!(repo = %fork, error = %e, "could not list branches of app fork");
            false
        }
    };

    if has_branch {
        CloneSource {
            repo: fork,
            branch: head.branch.clone(),
        }
    } else {
        CloneSource {
            repo: job.repo.app_address.clone(),
            branch: job.repo.app_branch.clone(),
        }
    }
}

const GITHUB_URL: &str = "https://github.com/";

pub fn clone_url(repo: &str) -> String {
    format!("{GITHUB_URL}{repo}")
}

/// Environment that makes `git` send `token` as an HTTP header.
///
/// The token stays out of the argument vector (visible in `ps` to every user
/// of the node) and out of the clone's `.git/config`. Empty when `token` is.
pub fn auth_env(token: &str) -> Vec<(String, String)> {
    if token.is_empty() {
        return Vec::new();
    }
    let basic = STANDARD.encode(format!("x-access-token:{token}"));
    vec![
        ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
        ("GIT_CONFIG_KEY_0".to_string(), format!("http.{GITHUB_URL}.extraheader")),
        ("GIT_CONFIG_VALUE_0".to_string(), format!("AUTHORIZATION: basic {basic}")),
    ]
}

/// `YYYYmmddHHMMSS` in local time; makes repeated runs of a job distinct.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Clone `source` into `clone_dir` and record the checkout location.
///
/// A failed clone is only logged: the next step notices the checkout is
/// missing and fails with a more useful message.
pub async fn clone_checkout(
    job: &mut Job,
    ctx: &JobContext<'_>,
    source: &CloneSource,
    clone_dir: &Path,
) -> Result<Checkout> {
    let path = clone_dir.join(job.repo.app_name());
    job.append(format!("Repo location: {}", path.display()));

    tokio::fs::create_dir_all(clone_dir).await?;

    let mut clone = CommandSpec::new("git", clone_dir)
        .args(["clone", "-b", source.branch.as_str()])
        .arg(clone_url(&source.repo));
    for (key, value) in auth_env(ctx.token) {
        clone = clone.env(key, value);
    }
    info!(repo = %source.repo, branch = %source.branch, dir = %clone_dir.display(), "starting repo clone");
    job.run_commands(ctx.runner, &[clone]).await;

    Ok(Checkout {
        clone_dir: clone_dir.to_path_buf(),
        path,
    })
}
