// src/remote/model.rs

use serde::{Deserialize, Serialize};

/// Identifier of an issue comment, kept so a later run can edit it.
pub type CommentId = u64;

/// An open change request (pull request) as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Per-repository number (`#123`).
    pub number: u64,
    /// Globally unique id; used to name clone directories.
    pub id: u64,
    /// `owner/name` of the repository the request targets.
    pub repo: String,
    pub head: HeadRef,
    pub labels: Vec<String>,
}

/// The source side of a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadRef {
    /// Repository name without owner, e.g. `regional_workflow`.
    pub repo_name: String,
    /// `owner/name` of the head repository (usually a fork).
    pub repo_full_name: String,
    /// Branch name.
    pub branch: String,
    pub sha: String,
    /// Login of the fork owner.
    pub user_login: String,
}
