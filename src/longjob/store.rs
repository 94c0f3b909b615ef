// src/longjob/store.rs

//! On-disk record of experiments still being tracked after a dispatch run.
//!
//! The file is JSON lines, one [`LongJobRecord`] per line, keyed by the
//! experiment's log path. It is always rewritten whole, through a temporary
//! file in the same directory that is renamed over the original, so a crash
//! never leaves a truncated file behind.
//!
//! The dispatcher and the resumer both write this file; they must not run
//! at the same time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::Result;
use crate::remote::CommentId;

/// One experiment whose completion has not been observed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongJobRecord {
    /// Expected experiment log; the record's key.
    pub log_path: PathBuf,
    pub experiment: String,
    pub machine: String,
    /// `owner/name` of the repository the change request lives in.
    pub repo: String,
    pub request_number: u64,
    /// Comment to append results to.
    pub comment_id: CommentId,
}

/// Handle on the long-job state file.
#[derive(Debug, Clone)]
pub struct LongJobStore {
    path: PathBuf,
}

impl LongJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load all records; a missing file means no records.
    pub fn load(&self) -> Result<Vec<LongJobRecord>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        debug!(path = %self.path.display(), count = records.len(), "loaded long-job records");
        Ok(records)
    }

    /// Atomically replace the file with exactly `records`.
    pub fn save(&self, records: &[LongJobRecord]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        for record in records {
            serde_json::to_writer(&mut tmp, record)?;
            tmp.write_all(b"\n")?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), count = records.len(), "saved long-job records");
        Ok(())
    }

    /// Add `records` to the file, replacing any with the same log path.
    pub fn merge(&self, records: Vec<LongJobRecord>) -> Result<()> {
        let mut all = self.load()?;
        for record in records {
            match all.iter_mut().find(|r| r.log_path == record.log_path) {
                Some(existing) => *existing = record,
                None => all.push(record),
            }
        }
        self.save(&all)?;
        info!(path = %self.path.display(), count = all.len(), "long-job records persisted");
        Ok(())
    }

    /// Delete the file. A missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "long-job state file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
