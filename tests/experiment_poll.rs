// tests/experiment_poll.rs

mod common;
use crate::common::builders::{app_repo, ConfigFileBuilder, RequestBuilder, APP_ADDRESS};
use crate::common::{clone_target, exit, init_tracing, with_timeout, write_file, FakeCommandRunner, FakeRemote, Harness};

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ci_auto::exec::{CommandOutput, CommandSpec};
use ci_auto::fs::RealFileSystem;
use ci_auto::job::{collect_jobs, dispatch};
use ci_auto::longjob::resume;

type TestResult = Result<(), Box<dyn Error>>;

const LABEL: &str = "ci-hera-intel-WE";

/// Clone leaves a checkout that has the WE2E setup script.
fn clone_with_we2e(spec: &CommandSpec) -> CommandOutput {
    let checkout = clone_target(spec);
    write_file(checkout.join("Externals.cfg"), "[externals_description]\nschema_version = 1.0.0\n");
    write_file(
        checkout.join("regional_workflow/tests/WE2E/setup_WE2E_tests.sh"),
        "#!/bin/sh\n",
    );
    exit(0)
}

fn build_ok(spec: &CommandSpec) -> CommandOutput {
    write_file(spec.output.as_ref().unwrap(), "ALL BUILDS SUCCEEDED\n");
    exit(0)
}

/// `<clone dir>` from the setup script's working directory
/// `<clone dir>/<app>/regional_workflow/tests/WE2E`.
fn clone_dir_of(spec: &CommandSpec) -> PathBuf {
    spec.cwd.ancestors().nth(4).unwrap().to_path_buf()
}

fn harness(workdir: &std::path::Path, runner: FakeCommandRunner) -> Harness {
    let cfg = ConfigFileBuilder::new(workdir).with_repo(app_repo()).build();
    let remote = FakeRemote::new();
    remote.add_request(RequestBuilder::new(APP_ADDRESS).label(LABEL).build());
    Harness::new(cfg, remote, runner)
}

#[tokio::test]
async fn unfinished_experiment_is_handed_to_long_term_tracking() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let expts = Arc::new(Mutex::new(None::<PathBuf>));
    let runner = {
        let expts = Arc::clone(&expts);
        FakeCommandRunner::new()
            .on("git", clone_with_we2e)
            .on("./build.sh", build_ok)
            .on("./setup_WE2E_tests.sh", move |spec| {
                let base = clone_dir_of(spec).join("expt_dirs");
                write_file(
                    base.join("expt_a/log/FV3LAM_wflow.log"),
                    "cycle 1 started\ntask make_grid is DEAD  \nlater line\n",
                );
                write_file(base.join("expt_b/log/FV3LAM_wflow.log"), "cycle 1 started\n");
                *expts.lock().unwrap() = Some(base);
                exit(0)
            })
    };
    let h = harness(workdir.path(), runner);

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    with_timeout(dispatch(jobs, &h.ctx())).await;

    let setup = h.runner.find("./setup_WE2E_tests.sh").unwrap();
    assert_eq!(setup.args, vec!["hera", "nems"]);
    assert!(setup.output.unwrap().ends_with("expt.out"));

    let comments = h.remote.comments_on(APP_ADDRESS, 7);
    assert_eq!(comments.len(), 1, "exactly one comment for the run");
    let body = &comments[0];
    assert!(body.contains("Build was Successful\nRocoto jobs started\n"));
    assert!(body.contains("Experiment failed: expt_a\ntask make_grid is DEAD\n"));
    assert!(!body.contains("expt_b\n"));
    assert!(body.contains("Long term tracking will be done on 1 experiments\n"));
    assert!(body.ends_with(&format!("{LABEL}\n")));

    let records = h.store.load()?;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    let base = expts.lock().unwrap().clone().unwrap();
    assert_eq!(record.experiment, "expt_b");
    assert_eq!(record.log_path, base.join("expt_b/log/FV3LAM_wflow.log"));
    assert_eq!(record.machine, "hera");
    assert_eq!(record.repo, APP_ADDRESS);
    assert_eq!(record.request_number, 7);
    let comment_id = match h.remote.events().last() {
        Some(common::RemoteEvent::CommentCreated { id, .. }) => *id,
        other => panic!("expected a created comment, got {other:?}"),
    };
    assert_eq!(record.comment_id, comment_id);

    // expt_b finishes later; a resume pass completes the comment.
    fs::write(&record.log_path, "cycle 1 started\nThis cycle is complete: 2019070100\n")?;
    let summary = resume(&h.store, &h.remote, &RealFileSystem, &h.cfg.poll.markers).await?;
    assert_eq!(summary.completed, 1);
    assert!(summary.state_file_removed);
    assert!(!h.store.exists());

    let body = h.remote.comment(comment_id).unwrap().body;
    assert!(body.contains("Long term tracking will be done on 1 experiments\n"));
    assert!(body.ends_with("Experiment Succeeded on hera: expt_b\nAll experiments completed\n"));
    Ok(())
}

#[tokio::test]
async fn failed_tracking_comment_is_replaced_by_one_failure_report() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let runner = FakeCommandRunner::new()
        .on("git", clone_with_we2e)
        .on("./build.sh", build_ok)
        .on("./setup_WE2E_tests.sh", |spec| {
            let base = clone_dir_of(spec).join("expt_dirs");
            write_file(base.join("expt_a/log/FV3LAM_wflow.log"), "This cycle is complete\n");
            write_file(base.join("expt_b/log/FV3LAM_wflow.log"), "cycle 1 started\n");
            exit(0)
        });
    let h = harness(workdir.path(), runner);
    h.remote.fail_next_comments(1);

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    with_timeout(dispatch(jobs, &h.ctx())).await;

    let comments = h.remote.comments_on(APP_ADDRESS, 7);
    assert_eq!(comments.len(), 1);
    let body = &comments[0];
    assert!(body.contains("Experiment done: expt_a\n"));
    assert!(!body.contains("Long term tracking"));
    assert!(body.contains("Job failed: Remote API error: 502 - bad gateway\n"));
    assert_eq!(body.matches("If test failed").count(), 1);
    assert_eq!(body.matches(LABEL).count(), 1);
    assert!(body.ends_with(&format!("{LABEL}\n")));
    assert!(!h.store.exists());
    Ok(())
}

#[tokio::test]
async fn experiments_finished_while_polling_need_no_tracking() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let runner = FakeCommandRunner::new()
        .on("git", clone_with_we2e)
        .on("./build.sh", build_ok)
        .on("./setup_WE2E_tests.sh", |spec| {
            let base = clone_dir_of(spec).join("expt_dirs");
            write_file(base.join("expt_a/log/FV3LAM_wflow.log"), "This cycle is complete\n");
            write_file(base.join("expt_b/log/FV3LAM_wflow.log"), "This cycle is complete\n");
            exit(0)
        });
    let h = harness(workdir.path(), runner);

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    with_timeout(dispatch(jobs, &h.ctx())).await;

    let comments = h.remote.comments_on(APP_ADDRESS, 7);
    assert_eq!(comments.len(), 1);
    assert!(comments[0].contains("Experiment done: expt_a\n"));
    assert!(comments[0].contains("Experiment done: expt_b\n"));
    assert_eq!(comments[0].matches("Experiment done").count(), 2);
    assert!(!comments[0].contains("Long term tracking"));
    assert!(!h.store.exists());
    Ok(())
}

#[tokio::test]
async fn no_experiment_dirs_reports_generation_errors() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let runner = FakeCommandRunner::new()
        .on("git", |spec| {
            let out = clone_with_we2e(spec);
            write_file(
                clone_target(spec).join("regional_workflow/ush/log.generate_FV3LAM_wflow"),
                "setting up\nERROR: grid file missing\n  err_msg=\"bad\"\ndone\n",
            );
            out
        })
        .on("./build.sh", build_ok);
    let h = harness(workdir.path(), runner);

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    with_timeout(dispatch(jobs, &h.ctx())).await;

    let body = &h.remote.comments_on(APP_ADDRESS, 7)[0];
    assert!(!body.contains("Rocoto jobs started"));
    assert!(body.contains(
        "Generating Workflow Failed\nERROR: grid file missing\n  err_msg=\"bad\"\ndone\n"
    ));
    assert!(!body.contains("setting up"));
    Ok(())
}

#[tokio::test]
async fn missing_setup_script_is_reported() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let runner = FakeCommandRunner::new()
        .on("git", |spec| {
            write_file(clone_target(spec).join("Externals.cfg"), "");
            exit(0)
        })
        .on("./build.sh", build_ok);
    let h = harness(workdir.path(), runner);

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    dispatch(jobs, &h.ctx()).await;

    let body = &h.remote.comments_on(APP_ADDRESS, 7)[0];
    assert!(body.contains("regional_workflow/tests/WE2E/setup_WE2E_tests.sh does not exist in repo\n"));
    assert!(body.contains("Cannot run WE2E tests\n"));
    assert!(h.runner.find("./setup_WE2E_tests.sh").is_none());
    Ok(())
}
