// tests/regression_job.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, RequestBuilder};
use crate::common::{clone_target, exit, init_tracing, write_file, FakeCommandRunner, FakeRemote, Harness};

use std::error::Error;

use ci_auto::config::RepoConfig;
use ci_auto::job::{collect_jobs, dispatch};

type TestResult = Result<(), Box<dyn Error>>;

const GSI: &str = "NOAA-EMC/GSI";

fn gsi_repo() -> RepoConfig {
    RepoConfig {
        name: "GSI".to_string(),
        address: GSI.to_string(),
        base: "master".to_string(),
        app_address: GSI.to_string(),
        app_branch: "master".to_string(),
    }
}

const CTEST_LOG: &str = "\
UpdateCTestConfiguration  from :/work/build/regression/DartConfiguration.tcl
1/3 Test #1: global_3dvar ........................   Passed  1934.35 sec
2/3 Test #2: global_4dvar ........................***Failed  2214.92 sec
1: The case has Failed the scalability test.
1: Thus, the case has failed.
3/3 Test  #3: rtma ...............................   Passed  987.10 sec
67% tests passed, 1 tests failed out of 3
";

fn setup(ctest_log: &'static str, install: bool) -> FakeCommandRunner {
    FakeCommandRunner::new()
        .on("git", |spec| {
            std::fs::create_dir_all(clone_target(spec)).unwrap();
            exit(0)
        })
        .on("./build.sh", move |spec| {
            write_file(spec.output.as_ref().unwrap(), "[100%] Built target gsi.x\n");
            if install {
                let checkout = spec.cwd.parent().unwrap();
                write_file(checkout.join("install/bin/gsi.x"), "");
                write_file(checkout.join("install/bin/enkf.x"), "");
            }
            exit(0)
        })
        .on("ctest", move |spec| {
            write_file(spec.output.as_ref().unwrap(), ctest_log);
            exit(8)
        })
}

#[tokio::test]
async fn regression_run_reports_ctest_summary_and_failed_tests() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new(workdir.path()).with_repo(gsi_repo()).build();
    let remote = FakeRemote::new();
    remote.add_request(RequestBuilder::new(GSI).label("ci-hera-intel-rt").build());
    let h = Harness::new(cfg, remote, setup(CTEST_LOG, true));

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    dispatch(jobs, &h.ctx()).await;

    let commands = h.runner.command_lines();
    let root = workdir.path().display().to_string();
    assert!(commands.contains(&format!("cp -r {root}/vlab/GSI/fix/. fix/")));
    assert!(commands.contains(&format!("cp -r {root}/gsia/regression/regression_var.sh regression/")));

    let build = h.runner.find("./build.sh").unwrap();
    assert_eq!(build.args, vec!["../"]);
    assert_eq!(build.env, vec![("config_path".to_string(), root.clone())]);
    assert!(build.cwd.starts_with(workdir.path().join("pr/1007")));
    assert!(build.cwd.ends_with("GSI/ush"));

    let ctest = h.runner.find("ctest").unwrap();
    assert_eq!(ctest.args, vec!["--verbose"]);
    assert!(ctest.cwd.ends_with("GSI/build/regression"));

    let body = &h.remote.comments_on(GSI, 7)[0];
    assert!(body.contains("Build was Successful\n"));
    assert!(body.contains("2/3 Test 2: global_4dvar ........................***Failed  2214.92 sec\n"));
    assert!(body.contains("1: The case has Failed the scalability test.\n"));
    assert!(body.contains("1: Thus, the case has failed.\n"));
    assert!(body.contains("3/3 Test  3: rtma"));
    assert!(!body.contains("UpdateCTestConfiguration"));
    assert!(body.contains("Failed tests: global_4dvar\n"));
    assert!(body.ends_with("ci-hera-intel-rt\n"));
    Ok(())
}

#[tokio::test]
async fn missing_executables_fail_the_build() -> TestResult {
    init_tracing();
    let workdir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new(workdir.path()).with_repo(gsi_repo()).build();
    let remote = FakeRemote::new();
    remote.add_request(RequestBuilder::new(GSI).label("ci-hera-gnu-rt").build());
    let h = Harness::new(cfg, remote, setup(CTEST_LOG, false));

    let (jobs, _) = collect_jobs(&h.cfg, &h.remote).await;
    dispatch(jobs, &h.ctx()).await;

    let body = &h.remote.comments_on(GSI, 7)[0];
    assert!(body.contains("Build failed\n"));
    assert!(!body.contains("Build was Successful"));
    assert!(!body.contains("Job failed"));
    assert!(h.runner.find("ctest").is_none());
    Ok(())
}
