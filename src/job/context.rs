// src/job/context.rs

use crate::config::PollSettings;
use crate::exec::CommandRunner;
use crate::fs::FileSystem;
use crate::longjob::LongJobStore;
use crate::remote::RemoteService;

/// Collaborators shared by every job of one dispatch run.
///
/// Jobs hold no state of their own beyond their report; everything that
/// touches the outside world comes through here.
pub struct JobContext<'a> {
    pub remote: &'a dyn RemoteService,
    pub runner: &'a dyn CommandRunner,
    pub fs: &'a dyn FileSystem,
    pub poll: &'a PollSettings,
    pub store: &'a LongJobStore,
    /// Used in clone URLs; masked in logs. Empty means anonymous clones.
    pub token: &'a str,
}
