// src/github/mod.rs
// GitHub collaborator: the two issue-comment writes the bot performs

use async_trait::async_trait;

use crate::error::Result;

pub mod auth;
pub mod client;

pub use auth::{AppCredentials, GitHubAuth};
pub use client::GitHubClient;

/// Repository a write goes to, plus the App installation to act as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub installation_id: Option<u64>,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn create_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()>;

    async fn update_comment(&self, repo: &RepoRef, comment_id: u64, body: &str) -> Result<()>;
}
