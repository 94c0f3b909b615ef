// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod job;
pub mod logging;
pub mod logscan;
pub mod longjob;
pub mod poll;
pub mod remote;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, ConfigFile};
use crate::exec::RealCommandRunner;
use crate::fs::RealFileSystem;
use crate::job::{collect_jobs, dispatch, Job, JobContext};
use crate::longjob::{resume, LongJobStore};
use crate::remote::{load_token, GitHubClient};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the access token
/// - the GitHub client
/// - the real command runner and filesystem
/// - the long-job state file
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let root = config_root_dir(&args.config);

    let token = load_token(&resolve(&root, &cfg.github.token_file))?;
    let remote = GitHubClient::new(&cfg.github.api_url, token.clone())?;
    let store = LongJobStore::new(resolve(&root, &cfg.poll.state_file));

    match args.command {
        Command::Dispatch { dry_run } => {
            let (jobs, summary) = collect_jobs(&cfg, &remote).await;
            info!(
                repos = summary.repos_scanned,
                failed = summary.repos_failed,
                jobs = summary.jobs,
                machine = %cfg.machine.name,
                "collected jobs"
            );

            if dry_run {
                print_dry_run(&cfg, &jobs);
                return Ok(());
            }

            let ctx = JobContext {
                remote: &remote,
                runner: &RealCommandRunner,
                fs: &RealFileSystem,
                poll: &cfg.poll,
                store: &store,
                token: &token,
            };
            dispatch(jobs, &ctx).await;
        }
        Command::Resume => {
            let summary = resume(&store, &remote, &RealFileSystem, &cfg.poll.markers).await?;
            info!(
                tracked = summary.tracked,
                completed = summary.completed,
                remaining = summary.remaining,
                comments = summary.comments_edited,
                "resume finished"
            );
        }
    }

    Ok(())
}

/// Directory relative paths in the config are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "etc/CiAuto.toml"),
///   we use that directory.
/// - If it's just a bare filename like "CiAuto.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Simple dry-run output: the jobs this run would execute.
fn print_dry_run(cfg: &ConfigFile, jobs: &[Job]) {
    println!("ci-auto dry-run on {}", cfg.machine.name);
    println!("  workdir = {}", cfg.machine.workdir.display());
    println!(
        "  approved actions = {:?}",
        cfg.approved_actions.iter().map(|a| a.label_name()).collect::<Vec<_>>()
    );
    println!();

    println!("jobs ({}):", jobs.len());
    for job in jobs {
        println!("  - {} #{}: {}", job.request.repo, job.request.number, job.label);
        println!("      head: {}@{}", job.request.head.repo_full_name, job.request.head.branch);
        println!("      compiler: {}  action: {}", job.compiler, job.action);
    }
}
