use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ci_auto::errors::{CiError, Result};
use ci_auto::remote::{ChangeRequest, CommentId, RemoteService};

/// One mutating call made against the fake, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    LabelRemoved { repo: String, number: u64, label: String },
    CommentCreated { repo: String, number: u64, id: CommentId },
    CommentEdited { repo: String, id: CommentId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeComment {
    pub repo: String,
    pub number: u64,
    pub body: String,
}

#[derive(Debug, Default)]
struct State {
    requests: BTreeMap<String, Vec<ChangeRequest>>,
    labels: BTreeMap<(String, u64), Vec<String>>,
    branches: BTreeMap<String, Vec<String>>,
    comments: BTreeMap<CommentId, FakeComment>,
    next_comment_id: CommentId,
    failing_repos: BTreeSet<String>,
    fail_edits: bool,
    failing_creates: usize,
    events: Vec<RemoteEvent>,
}

/// In-memory `RemoteService`.
///
/// Clones share state, so a test can keep a handle for assertions (or hand
/// one to a fake command) while the code under test holds another.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<State>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.lock().next_comment_id = 1000;
        remote
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add an open request; its labels become the request's current labels.
    pub fn add_request(&self, request: ChangeRequest) {
        let mut state = self.lock();
        state
            .labels
            .insert((request.repo.clone(), request.number), request.labels.clone());
        state
            .requests
            .entry(request.repo.clone())
            .or_default()
            .push(request);
    }

    pub fn set_labels(&self, repo: &str, number: u64, labels: &[&str]) {
        self.lock().labels.insert(
            (repo.to_string(), number),
            labels.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn add_branches(&self, repo: &str, branches: &[&str]) {
        self.lock()
            .branches
            .entry(repo.to_string())
            .or_default()
            .extend(branches.iter().map(|b| b.to_string()));
    }

    /// Seed an existing comment and return its id.
    pub fn add_comment(&self, repo: &str, number: u64, body: &str) -> CommentId {
        let mut state = self.lock();
        let id = state.next_comment_id;
        state.next_comment_id += 1;
        state.comments.insert(
            id,
            FakeComment {
                repo: repo.to_string(),
                number,
                body: body.to_string(),
            },
        );
        id
    }

    /// Make listing requests of `repo` fail.
    pub fn fail_listing(&self, repo: &str) {
        self.lock().failing_repos.insert(repo.to_string());
    }

    pub fn fail_edits(&self) {
        self.lock().fail_edits = true;
    }

    /// Make the next `count` comment creations fail with a 502.
    pub fn fail_next_comments(&self, count: usize) {
        self.lock().failing_creates = count;
    }

    pub fn labels(&self, repo: &str, number: u64) -> Vec<String> {
        self.lock()
            .labels
            .get(&(repo.to_string(), number))
            .cloned()
            .unwrap_or_default()
    }

    pub fn comment(&self, id: CommentId) -> Option<FakeComment> {
        self.lock().comments.get(&id).cloned()
    }

    /// All comments on one request, oldest first.
    pub fn comments_on(&self, repo: &str, number: u64) -> Vec<String> {
        self.lock()
            .comments
            .values()
            .filter(|c| c.repo == repo && c.number == number)
            .map(|c| c.body.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<RemoteEvent> {
        self.lock().events.clone()
    }
}

fn not_found(what: String) -> CiError {
    CiError::RemoteError {
        status: 404,
        message: format!("{what} not found"),
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn list_open_requests(&self, repo: &str, _base: &str) -> Result<Vec<ChangeRequest>> {
        let state = self.lock();
        if state.failing_repos.contains(repo) {
            return Err(CiError::RemoteError {
                status: 500,
                message: "listing failed".to_string(),
            });
        }
        // Like the real API: labels as of listing time.
        Ok(state
            .requests
            .get(repo)
            .into_iter()
            .flatten()
            .map(|r| {
                let mut r = r.clone();
                if let Some(labels) = state.labels.get(&(r.repo.clone(), r.number)) {
                    r.labels = labels.clone();
                }
                r
            })
            .collect())
    }

    async fn list_labels(&self, repo: &str, number: u64) -> Result<Vec<String>> {
        Ok(self.labels(repo, number))
    }

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> Result<()> {
        let mut state = self.lock();
        let labels = state
            .labels
            .get_mut(&(repo.to_string(), number))
            .ok_or_else(|| not_found(format!("request {repo}#{number}")))?;
        let before = labels.len();
        labels.retain(|l| l != label);
        if labels.len() == before {
            return Err(not_found(format!("label {label}")));
        }
        state.events.push(RemoteEvent::LabelRemoved {
            repo: repo.to_string(),
            number,
            label: label.to_string(),
        });
        Ok(())
    }

    async fn create_comment(&self, repo: &str, number: u64, body: &str) -> Result<CommentId> {
        {
            let mut state = self.lock();
            if state.failing_creates > 0 {
                state.failing_creates -= 1;
                return Err(CiError::RemoteError {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
        }
        let id = self.add_comment(repo, number, body);
        self.lock().events.push(RemoteEvent::CommentCreated {
            repo: repo.to_string(),
            number,
            id,
        });
        Ok(id)
    }

    async fn get_comment(&self, _repo: &str, id: CommentId) -> Result<String> {
        self.comment(id)
            .map(|c| c.body)
            .ok_or_else(|| not_found(format!("comment {id}")))
    }

    async fn edit_comment(&self, repo: &str, id: CommentId, body: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_edits {
            return Err(CiError::RemoteError {
                status: 502,
                message: "edit failed".to_string(),
            });
        }
        let comment = state
            .comments
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("comment {id}")))?;
        comment.body = body.to_string();
        state.events.push(RemoteEvent::CommentEdited {
            repo: repo.to_string(),
            id,
        });
        Ok(())
    }

    async fn list_branches(&self, repo: &str) -> Result<Vec<String>> {
        self.lock()
            .branches
            .get(repo)
            .cloned()
            .ok_or_else(|| not_found(format!("repo {repo}")))
    }
}
