// src/logscan.rs

//! Outcome classification by marker strings in log files.
//!
//! The build and workflow tooling reports success or failure only through
//! fixed substrings in its logs, so these strings are effectively the wire
//! protocol with those tools and must match exactly.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ExperimentMarkers;
use crate::errors::{CiError, Result};
use crate::fs::FileSystem;

pub const BUILD_SUCCESS_MARKER: &str = "ALL BUILDS SUCCEEDED";
pub const BUILD_FAIL_MARKER: &str = "FAIL";

/// Markers of a failed workflow generation step.
const GENERATION_ERROR_MARKERS: [&str; 2] = ["ERROR", "err_msg"];

/// ctest output lines worth copying into the report.
const CTEST_REPORT_MARKERS: [&str; 6] = ["Test #", "Test  #", "ed the", "Thus", "resulting", "job has"];

/// Result of scanning a build log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildLog {
    pub succeeded: bool,
    /// Every line containing `FAIL`, trailing whitespace trimmed, in order.
    pub fail_lines: Vec<String>,
}

/// Scan a build log for the success marker and failing lines.
///
/// A missing log is an error distinct from a failed build.
pub fn classify_build_log(fs: &dyn FileSystem, path: &Path) -> Result<BuildLog> {
    if !fs.is_file(path) {
        return Err(CiError::LogNotFound(path.to_path_buf()));
    }

    let text = fs.read_to_string(path)?;
    let mut log = BuildLog::default();
    for line in text.lines() {
        if line.contains(BUILD_FAIL_MARKER) {
            log.fail_lines.push(line.trim_end().to_string());
        } else if line.contains(BUILD_SUCCESS_MARKER) {
            log.succeeded = true;
        }
    }
    Ok(log)
}

/// Observed state of one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentState {
    /// No log yet.
    Pending,
    /// Log exists, no terminal marker.
    Running,
    Succeeded,
    Failed,
}

impl ExperimentState {
    pub fn is_done(&self) -> bool {
        matches!(self, ExperimentState::Succeeded | ExperimentState::Failed)
    }
}

/// State of an experiment plus the log line that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentStatus {
    pub state: ExperimentState,
    pub line: Option<String>,
}

/// Scan an experiment log; the first line carrying either marker wins.
pub fn scan_experiment_log(
    fs: &dyn FileSystem,
    path: &Path,
    markers: &ExperimentMarkers,
) -> Result<ExperimentStatus> {
    if !fs.is_file(path) {
        return Ok(ExperimentStatus {
            state: ExperimentState::Pending,
            line: None,
        });
    }

    let text = fs.read_to_string(path)?;
    for line in text.lines() {
        let state = if line.contains(&markers.complete) {
            ExperimentState::Succeeded
        } else if line.contains(&markers.failed) {
            ExperimentState::Failed
        } else {
            continue;
        };
        return Ok(ExperimentStatus {
            state,
            line: Some(line.trim_end().to_string()),
        });
    }

    Ok(ExperimentStatus {
        state: ExperimentState::Running,
        line: None,
    })
}

/// Lines of a workflow generation log from the first error onwards.
///
/// Empty if the log is missing or has no error.
pub fn generation_errors(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>> {
    if !fs.is_file(path) {
        return Ok(Vec::new());
    }

    let text = fs.read_to_string(path)?;
    Ok(text
        .lines()
        .skip_while(|line| !GENERATION_ERROR_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| line.trim_end().to_string())
        .collect())
}

/// What a ctest log says about a regression run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtestSummary {
    /// Lines for the report, with `#` stripped.
    pub report_lines: Vec<String>,
    /// Names of tests ctest reported as `***Failed`.
    pub failed_tests: Vec<String>,
}

fn failed_test_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Test\s+#\d+:\s+(\S+?)\s*\.*\s*\*\*\*Failed").expect("valid ctest regex")
    })
}

/// Summarise a `ctest --verbose` log. A missing log yields an empty summary.
pub fn scan_ctest_log(fs: &dyn FileSystem, path: &Path) -> Result<CtestSummary> {
    let mut summary = CtestSummary::default();
    if !fs.is_file(path) {
        return Ok(summary);
    }

    let text = fs.read_to_string(path)?;
    for line in text.lines() {
        if let Some(caps) = failed_test_re().captures(line) {
            let name = caps[1].to_string();
            if !summary.failed_tests.contains(&name) {
                summary.failed_tests.push(name);
            }
        }
        if CTEST_REPORT_MARKERS.iter().any(|m| line.contains(m)) {
            summary.report_lines.push(line.trim_end().replace('#', ""));
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn markers() -> ExperimentMarkers {
        ExperimentMarkers {
            complete: "This cycle is complete".to_string(),
            failed: "DEAD".to_string(),
        }
    }

    #[test]
    fn build_log_success_marker() {
        let fs = MockFileSystem::new();
        fs.add_file("/b/build.out", "compiling\nALL BUILDS SUCCEEDED\n");

        let log = classify_build_log(&fs, Path::new("/b/build.out")).unwrap();
        assert!(log.succeeded);
        assert!(log.fail_lines.is_empty());
    }

    #[test]
    fn build_log_collects_every_fail_line_in_order() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/b/build.out",
            "ok\nFAIL: ufs_model   \nstill going\nBUILD FAILED for chgres\n",
        );

        let log = classify_build_log(&fs, Path::new("/b/build.out")).unwrap();
        assert!(!log.succeeded);
        assert_eq!(
            log.fail_lines,
            vec!["FAIL: ufs_model".to_string(), "BUILD FAILED for chgres".to_string()]
        );
    }

    #[test]
    fn missing_build_log_is_log_not_found() {
        let fs = MockFileSystem::new();
        assert!(matches!(
            classify_build_log(&fs, Path::new("/b/build.out")),
            Err(CiError::LogNotFound(_))
        ));
    }

    #[test]
    fn experiment_states_follow_log_contents() {
        let fs = MockFileSystem::new();
        let log = Path::new("/e/log/FV3LAM_wflow.log");

        assert_eq!(
            scan_experiment_log(&fs, log, &markers()).unwrap().state,
            ExperimentState::Pending
        );

        fs.add_file(log, "Submitting task make_grid\n");
        assert_eq!(
            scan_experiment_log(&fs, log, &markers()).unwrap().state,
            ExperimentState::Running
        );

        fs.append(log, "Cycle 2019070100: This cycle is complete: Success\n");
        let status = scan_experiment_log(&fs, log, &markers()).unwrap();
        assert_eq!(status.state, ExperimentState::Succeeded);
        assert_eq!(
            status.line.as_deref(),
            Some("Cycle 2019070100: This cycle is complete: Success")
        );
    }

    #[test]
    fn first_marker_line_wins() {
        let fs = MockFileSystem::new();
        let log = Path::new("/e/log/FV3LAM_wflow.log");
        fs.add_file(log, "task run_fcst is DEAD\nThis cycle is complete\n");

        let status = scan_experiment_log(&fs, log, &markers()).unwrap();
        assert_eq!(status.state, ExperimentState::Failed);
        assert_eq!(status.line.as_deref(), Some("task run_fcst is DEAD"));
    }

    #[test]
    fn generation_errors_start_at_first_error() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/u/log.generate_FV3LAM_wflow",
            "setting up\nERROR: bad grid\ncontext line\n",
        );

        let lines = generation_errors(&fs, Path::new("/u/log.generate_FV3LAM_wflow")).unwrap();
        assert_eq!(lines, vec!["ERROR: bad grid", "context line"]);
        assert!(generation_errors(&fs, Path::new("/u/missing")).unwrap().is_empty());
    }

    #[test]
    fn ctest_summary_extracts_failures() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/r/gsi_ctest.out",
            "1/2 Test #1: global_3dvar .....................   Passed  1200.00 sec\n\
             2/2 Test #2: rtma .............................***Failed  900.00 sec\n\
             The runtime for rtma exceeded the threshold\n\
             unrelated noise\n",
        );

        let summary = scan_ctest_log(&fs, Path::new("/r/gsi_ctest.out")).unwrap();
        assert_eq!(summary.failed_tests, vec!["rtma".to_string()]);
        assert_eq!(summary.report_lines.len(), 3);
        assert!(summary.report_lines[0].starts_with("1/2 Test 1: global_3dvar"));
        assert!(!summary.report_lines.iter().any(|l| l.contains('#')));
    }
}
