// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ActionKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [machine]
/// name = "hera"
/// hpc_acc = "nems"
/// workdir = "/scratch1/ci"
///
/// [poll]
/// cycles = 2
/// delay = "6s"
///
/// [[repo]]
/// name = "regional_workflow"
/// address = "ufs-community/regional_workflow"
/// base = "develop"
/// app_address = "ufs-community/ufs-srweather-app"
/// app_branch = "develop"
/// ```
///
/// Only `[machine]` and at least one `[[repo]]` are required; the rest have
/// defaults. This is the unvalidated form; use
/// [`crate::config::load_and_validate`] to obtain a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub machine: MachineSection,

    #[serde(default)]
    pub github: GithubSection,

    #[serde(default)]
    pub actions: ActionsSection,

    #[serde(default)]
    pub poll: PollSection,

    /// All `[[repo]]` entries, in file order.
    #[serde(default, rename = "repo")]
    pub repos: Vec<RepoConfig>,
}

/// `[machine]` section: where this bot instance runs.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSection {
    /// Machine name as it appears in labels (`ci-<name>-...`).
    pub name: String,

    /// HPC account charged by experiment launches.
    pub hpc_acc: String,

    /// Root directory under which every job clones its checkout.
    pub workdir: PathBuf,
}

/// `[github]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_token_file() -> PathBuf {
    PathBuf::from("accesstoken")
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            api_url: default_api_url(),
        }
    }
}

/// `[actions]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsSection {
    /// Approved action names. Order is the tie-break when more than one
    /// matches a label.
    #[serde(default = "default_approved")]
    pub approved: Vec<String>,
}

fn default_approved() -> Vec<String> {
    vec!["build".to_string(), "WE".to_string(), "rt".to_string()]
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self {
            approved: default_approved(),
        }
    }
}

/// `[poll]` section: experiment polling budget and the marker strings the
/// workflow engine writes into experiment logs.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_cycles")]
    pub cycles: u32,

    /// Delay between cycles, e.g. `"6s"`, `"500ms"`, `"10m"`.
    #[serde(default = "default_delay")]
    pub delay: String,

    #[serde(default = "default_complete_marker")]
    pub complete_marker: String,

    #[serde(default = "default_failed_marker")]
    pub failed_marker: String,

    /// Long-job state file shared by `dispatch` and `resume`.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_cycles() -> u32 {
    2
}

fn default_delay() -> String {
    "6s".to_string()
}

fn default_complete_marker() -> String {
    "This cycle is complete".to_string()
}

fn default_failed_marker() -> String {
    "DEAD".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("Longjob.jsonl")
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            delay: default_delay(),
            complete_marker: default_complete_marker(),
            failed_marker: default_failed_marker(),
            state_file: default_state_file(),
        }
    }
}

/// One `[[repo]]` entry.
///
/// A workflow repository (one whose name differs from the app's) is built
/// inside its paired app repository; for app repositories `address` and
/// `app_address` name the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoConfig {
    /// Display name used in logs.
    pub name: String,
    /// `owner/name` of the repository whose pull requests are polled.
    pub address: String,
    /// Base branch pull requests must target.
    pub base: String,
    /// `owner/name` of the app repository.
    pub app_address: String,
    /// App branch used when a workflow PR has no matching app branch.
    pub app_branch: String,
}

impl RepoConfig {
    /// Name part of `app_address`; also the checkout directory name.
    pub fn app_name(&self) -> &str {
        self.app_address
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.app_address)
    }
}

/// Marker strings that end an experiment log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentMarkers {
    pub complete: String,
    pub failed: String,
}

/// Validated polling settings.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub cycles: u32,
    pub delay: Duration,
    pub markers: ExperimentMarkers,
    pub state_file: PathBuf,
}

/// Validated configuration.
///
/// Constructed only through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub machine: MachineSection,
    pub github: GithubSection,
    pub approved_actions: Vec<ActionKind>,
    pub poll: PollSettings,
    pub repos: Vec<RepoConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        machine: MachineSection,
        github: GithubSection,
        approved_actions: Vec<ActionKind>,
        poll: PollSettings,
        repos: Vec<RepoConfig>,
    ) -> Self {
        Self {
            machine,
            github,
            approved_actions,
            poll,
            repos,
        }
    }
}
