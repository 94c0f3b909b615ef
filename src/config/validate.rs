// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, ExperimentMarkers, PollSettings, RawConfigFile, RepoConfig,
};
use crate::errors::{CiError, Result};
use crate::types::ActionKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CiError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_machine(&raw)?;
        validate_repos(&raw.repos)?;
        let approved = parse_approved_actions(&raw.actions.approved)?;
        let poll = validate_poll(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.machine,
            raw.github,
            approved,
            poll,
            raw.repos,
        ))
    }
}

fn validate_machine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.machine.name.trim().is_empty() {
        return Err(CiError::ConfigError(
            "[machine].name must not be empty".to_string(),
        ));
    }
    if cfg.machine.hpc_acc.trim().is_empty() {
        return Err(CiError::ConfigError(
            "[machine].hpc_acc must not be empty".to_string(),
        ));
    }
    if !cfg.machine.workdir.is_dir() {
        return Err(CiError::ConfigError(format!(
            "work directory from config file {:?} not found",
            cfg.machine.workdir
        )));
    }
    Ok(())
}

fn validate_repos(repos: &[RepoConfig]) -> Result<()> {
    if repos.is_empty() {
        return Err(CiError::ConfigError(
            "config must contain at least one [[repo]] section".to_string(),
        ));
    }

    for repo in repos {
        for (field, value) in [("address", &repo.address), ("app_address", &repo.app_address)] {
            if !is_owner_slash_name(value) {
                return Err(CiError::ConfigError(format!(
                    "repo '{}' has invalid {field} '{value}' (expected owner/name)",
                    repo.name
                )));
            }
        }
        if repo.base.trim().is_empty() || repo.app_branch.trim().is_empty() {
            return Err(CiError::ConfigError(format!(
                "repo '{}' must set both base and app_branch",
                repo.name
            )));
        }
    }
    Ok(())
}

fn is_owner_slash_name(s: &str) -> bool {
    let mut parts = s.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

fn parse_approved_actions(names: &[String]) -> Result<Vec<ActionKind>> {
    if names.is_empty() {
        return Err(CiError::ConfigError(
            "[actions].approved must list at least one action".to_string(),
        ));
    }
    names
        .iter()
        .map(|name| name.parse::<ActionKind>().map_err(CiError::ConfigError))
        .collect()
}

fn validate_poll(cfg: &RawConfigFile) -> Result<PollSettings> {
    let poll = &cfg.poll;

    if poll.cycles == 0 {
        return Err(CiError::ConfigError(
            "[poll].cycles must be >= 1 (got 0)".to_string(),
        ));
    }

    let delay = parse_duration(&poll.delay)
        .map_err(|e| CiError::ConfigError(format!("[poll].delay: {e}")))?;

    if poll.complete_marker.is_empty() || poll.failed_marker.is_empty() {
        return Err(CiError::ConfigError(
            "[poll] markers must not be empty".to_string(),
        ));
    }

    Ok(PollSettings {
        cycles: poll.cycles,
        delay,
        markers: ExperimentMarkers {
            complete: poll.complete_marker.clone(),
            failed: poll.failed_marker.clone(),
        },
        state_file: poll.state_file.clone(),
    })
}

/// Parse a simple duration string like `"500ms"`, `"6s"`, `"10m"`, `"1h"`.
pub(crate) fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
