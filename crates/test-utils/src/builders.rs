#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ci_auto::config::{
    ActionsSection, ConfigFile, GithubSection, MachineSection, PollSection, RawConfigFile,
    RepoConfig,
};
use ci_auto::remote::{ChangeRequest, HeadRef};

pub const APP_ADDRESS: &str = "ufs-community/ufs-srweather-app";
pub const WORKFLOW_ADDRESS: &str = "ufs-community/regional_workflow";

/// Builder for `ConfigFile` to simplify test setup.
///
/// Defaults: machine `hera` with account `nems`, zero poll delay, and no
/// repositories (add at least one before `build`).
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                machine: MachineSection {
                    name: "hera".to_string(),
                    hpc_acc: "nems".to_string(),
                    workdir: workdir.as_ref().to_path_buf(),
                },
                github: GithubSection::default(),
                actions: ActionsSection::default(),
                poll: PollSection {
                    delay: "0s".to_string(),
                    ..PollSection::default()
                },
                repos: Vec::new(),
            },
        }
    }

    pub fn machine(mut self, name: &str) -> Self {
        self.config.machine.name = name.to_string();
        self
    }

    pub fn with_repo(mut self, repo: RepoConfig) -> Self {
        self.config.repos.push(repo);
        self
    }

    pub fn approved(mut self, actions: &[&str]) -> Self {
        self.config.actions.approved = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn cycles(mut self, cycles: u32) -> Self {
        self.config.poll.cycles = cycles;
        self
    }

    pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.poll.state_file = path.into();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// The app repository polled for its own pull requests.
pub fn app_repo() -> RepoConfig {
    RepoConfig {
        name: "ufs-srweather-app".to_string(),
        address: APP_ADDRESS.to_string(),
        base: "develop".to_string(),
        app_address: APP_ADDRESS.to_string(),
        app_branch: "develop".to_string(),
    }
}

/// A workflow repository built inside the app.
pub fn workflow_repo() -> RepoConfig {
    RepoConfig {
        name: "regional_workflow".to_string(),
        address: WORKFLOW_ADDRESS.to_string(),
        base: "develop".to_string(),
        app_address: APP_ADDRESS.to_string(),
        app_branch: "develop".to_string(),
    }
}

/// Builder for `ChangeRequest`.
///
/// Defaults to request #7 (id 1007) from `alice`'s fork of the app on
/// branch `feature/x`.
pub struct RequestBuilder {
    request: ChangeRequest,
}

impl RequestBuilder {
    pub fn new(repo: &str) -> Self {
        let name = repo.split_once('/').map(|(_, n)| n).unwrap_or(repo);
        Self {
            request: ChangeRequest {
                number: 7,
                id: 1007,
                repo: repo.to_string(),
                head: HeadRef {
                    repo_name: name.to_string(),
                    repo_full_name: format!("alice/{name}"),
                    branch: "feature/x".to_string(),
                    sha: "0123456789abcdef".to_string(),
                    user_login: "alice".to_string(),
                },
                labels: Vec::new(),
            },
        }
    }

    pub fn number(mut self, number: u64) -> Self {
        self.request.number = number;
        self.request.id = 1000 + number;
        self
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.request.head.branch = branch.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.request.labels.push(label.to_string());
        self
    }

    pub fn build(self) -> ChangeRequest {
        self.request
    }
}
