// src/remote/mod.rs

//! The change-request hosting service.
//!
//! Everything the bot does remotely goes through [`RemoteService`], so jobs
//! and the long-job resumer can be exercised against an in-memory fake.
//! [`GitHubClient`] is the production implementation.

pub mod github;
pub mod model;
pub mod service;
pub mod token;

pub use github::GitHubClient;
pub use model::{ChangeRequest, CommentId, HeadRef};
pub use service::RemoteService;
pub use token::load_token;
