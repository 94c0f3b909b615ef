// src/runner/externals.rs

//! Pointing one entry of an `Externals.cfg` at the code under review.
//!
//! The file is INI-style: `[section]` headers followed by `key = value`
//! lines. An entry may pin its source with exactly one of `hash`, `branch`
//! or `tag`; we pin by `hash`.

use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::fs::FileSystem;

pub const EXTERNALS_FILE: &str = "Externals.cfg";

/// Keys dropped from the rewritten section.
const EXCLUSIVE_REFS: [&str; 2] = ["branch", "tag"];

fn section_name(line: &str) -> Option<&str> {
    let line = line.trim();
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn key_of(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let end = trimmed.find(['=', ':'])?;
    Some(trimmed[..end].trim().to_ascii_lowercase())
}

/// Rewrite `section` so it pins `hash` from `repo_url`.
///
/// Returns `None` if the section does not exist.
pub fn rewrite_section(text: &str, section: &str, hash: &str, repo_url: &str) -> Option<String> {
    let mut out: Vec<String> = Vec::new();
    let mut found = false;
    let mut in_target = false;
    let mut wrote_hash = false;
    let mut wrote_url = false;

    let finish = |out: &mut Vec<String>, wrote_hash: bool, wrote_url: bool| {
        // Insert before any trailing blank lines of the section.
        let mut at = out.len();
        while at > 0 && out[at - 1].trim().is_empty() {
            at -= 1;
        }
        if !wrote_url {
            out.insert(at, format!("repo_url = {repo_url}"));
        }
        if !wrote_hash {
            out.insert(at, format!("hash = {hash}"));
        }
    };

    for line in text.lines() {
        if let Some(name) = section_name(line) {
            if in_target {
                finish(&mut out, wrote_hash, wrote_url);
            }
            in_target = name == section;
            found |= in_target;
            out.push(line.to_string());
            continue;
        }

        if in_target {
            match key_of(line).as_deref() {
                Some("hash") => {
                    out.push(format!("hash = {hash}"));
                    wrote_hash = true;
                    continue;
                }
                Some("repo_url") => {
                    out.push(format!("repo_url = {repo_url}"));
                    wrote_url = true;
                    continue;
                }
                Some(key) if EXCLUSIVE_REFS.contains(&key) => continue,
                _ => {}
            }
        }
        out.push(line.to_string());
    }
    if in_target {
        finish(&mut out, wrote_hash, wrote_url);
    }

    if !found {
        return None;
    }
    let mut rewritten = out.join("\n");
    rewritten.push('\n');
    Some(rewritten)
}

/// Rewrite `<checkout>/Externals.cfg` in place. Returns whether the
/// section was found.
pub fn pin_external(
    fs: &dyn FileSystem,
    checkout: &Path,
    section: &str,
    hash: &str,
    repo_url: &str,
) -> Result<bool> {
    let path = checkout.join(EXTERNALS_FILE);
    let text = fs.read_to_string(&path)?;
    match rewrite_section(&text, section, hash, repo_url) {
        Some(updated) => {
            fs.write(&path, updated.as_bytes())?;
            info!(section, hash, repo_url, "updated externals entry");
            Ok(true)
        }
        None => {
            info!(section, "no such section in {EXTERNALS_FILE}");
            Ok(false)
        }
    }
}
