// src/remote/github.rs

//! GitHub REST implementation of [`RemoteService`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{CiError, Result};
use crate::remote::model::{ChangeRequest, CommentId, HeadRef};
use crate::remote::service::RemoteService;

const PER_PAGE: usize = 100;

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
    name: String,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GhHead {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
    user: GhUser,
    // Null when the fork has been deleted.
    repo: Option<GhRepo>,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    number: u64,
    id: u64,
    #[serde(default)]
    labels: Vec<GhLabel>,
    head: GhHead,
}

#[derive(Debug, Deserialize)]
struct GhComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhBranch {
    name: String,
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

impl GitHubClient {
    /// Create a client against `api_url` (normally `https://api.github.com`).
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ci-auto/0.1"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(api_url).map_err(|e| {
            CiError::ConfigError(format!("invalid GitHub API url '{api_url}': {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CiError::ConfigError(format!("GitHub API url {} cannot be a base", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                // `owner/name` addresses are two path segments.
                path.extend(segment.split('/'));
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CiError::RemoteError {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    /// GET every page of a list endpoint.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let per_page = PER_PAGE.to_string();
        let mut page = 1u32;

        loop {
            let page_str = page.to_string();
            let builder = self
                .request(Method::GET, url.clone())
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_str.as_str())]);
            let batch: Vec<T> = self.send(builder).await?.json().await?;
            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

fn into_change_request(repo: &str, pull: GhPull) -> ChangeRequest {
    let (repo_name, repo_full_name) = match pull.head.repo {
        Some(r) => (r.name, r.full_name),
        None => (String::new(), String::new()),
    };
    ChangeRequest {
        number: pull.number,
        id: pull.id,
        repo: repo.to_string(),
        head: HeadRef {
            repo_name,
            repo_full_name,
            branch: pull.head.branch,
            sha: pull.head.sha,
            user_login: pull.head.user.login,
        },
        labels: pull.labels.into_iter().map(|l| l.name).collect(),
    }
}

#[async_trait]
impl RemoteService for GitHubClient {
    async fn list_open_requests(&self, repo: &str, base: &str) -> Result<Vec<ChangeRequest>> {
        let url = self.url(&["repos", repo, "pulls"])?;
        let pulls: Vec<GhPull> = self
            .get_paginated(
                url,
                &[
                    ("state", "open"),
                    ("sort", "created"),
                    ("direction", "asc"),
                    ("base", base),
                ],
            )
            .await?;

        debug!(repo, base, count = pulls.len(), "listed open pull requests");
        Ok(pulls
            .into_iter()
            .map(|p| into_change_request(repo, p))
            .collect())
    }

    async fn list_labels(&self, repo: &str, number: u64) -> Result<Vec<String>> {
        let url = self.url(&["repos", repo, "issues", &number.to_string(), "labels"])?;
        let labels: Vec<GhLabel> = self.get_paginated(url, &[]).await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> Result<()> {
        let mut url = self.url(&["repos", repo, "issues", &number.to_string(), "labels"])?;
        // Pushed separately so a label is never split on '/'.
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(label);
        }
        self.send(self.request(Method::DELETE, url)).await?;
        info!(repo, pr = number, label, "removed label");
        Ok(())
    }

    async fn create_comment(&self, repo: &str, number: u64, body: &str) -> Result<CommentId> {
        let url = self.url(&["repos", repo, "issues", &number.to_string(), "comments"])?;
        let response = self
            .send(self.request(Method::POST, url).json(&CommentBody { body }))
            .await?;
        let comment: GhComment = response.json().await?;
        info!(repo, pr = number, comment_id = comment.id, "created comment");
        Ok(comment.id)
    }

    async fn get_comment(&self, repo: &str, id: CommentId) -> Result<String> {
        let url = self.url(&["repos", repo, "issues", "comments", &id.to_string()])?;
        let comment: GhComment = self.get_json(url).await?;
        Ok(comment.body.unwrap_or_default())
    }

    async fn edit_comment(&self, repo: &str, id: CommentId, body: &str) -> Result<()> {
        let url = self.url(&["repos", repo, "issues", "comments", &id.to_string()])?;
        self.send(self.request(Method::PATCH, url).json(&CommentBody { body }))
            .await?;
        info!(repo, comment_id = id, "edited comment");
        Ok(())
    }

    async fn list_branches(&self, repo: &str) -> Result<Vec<String>> {
        let url = self.url(&["repos", repo, "branches"])?;
        let branches: Vec<GhBranch> = self.get_paginated(url, &[]).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }
}
