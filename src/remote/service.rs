// src/remote/service.rs

use async_trait::async_trait;

use crate::errors::Result;
use crate::remote::model::{ChangeRequest, CommentId};

/// Read/write operations the bot needs from the hosting service.
///
/// Repositories are addressed as `owner/name`; requests by their number.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Open requests targeting `base`, oldest first.
    async fn list_open_requests(&self, repo: &str, base: &str) -> Result<Vec<ChangeRequest>>;

    /// Current label names of a request.
    async fn list_labels(&self, repo: &str, number: u64) -> Result<Vec<String>>;

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> Result<()>;

    /// Post a new comment and return its id.
    async fn create_comment(&self, repo: &str, number: u64, body: &str) -> Result<CommentId>;

    /// Body of an existing comment.
    async fn get_comment(&self, repo: &str, id: CommentId) -> Result<String>;

    /// Replace the body of an existing comment.
    async fn edit_comment(&self, repo: &str, id: CommentId, body: &str) -> Result<()>;

    /// Branch names of a repository.
    async fn list_branches(&self, repo: &str) -> Result<Vec<String>>;
}
