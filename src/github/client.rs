// src/github/client.rs
// GitHub REST client for issue comments

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;
use tracing::{debug, instrument};

use super::{GitHubApi, GitHubAuth, RepoRef};
use crate::error::Result;
use crate::http::check_status;

const GITHUB_API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: Client,
    auth: GitHubAuth,
    api_base: String,
}

impl GitHubClient {
    pub fn new(client: Client, auth: GitHubAuth, api_base: impl Into<String>) -> Self {
        Self {
            client,
            auth,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn send_json(&self, method: Method, repo: &RepoRef, path: &str, body: serde_json::Value) -> Result<()> {
        let token = self
            .auth
            .bearer(&self.client, &self.api_base, repo.installation_id)
            .await?;

        let response = self
            .client
            .request(method, format!("{}/{}", self.api_base, path))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self, repo, body), fields(repo = %repo.full_name()))]
    async fn create_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        let path = format!("repos/{}/{}/issues/{}/comments", repo.owner, repo.name, issue_number);
        self.send_json(Method::POST, repo, &path, json!({ "body": body })).await?;
        debug!("Comment created");
        Ok(())
    }

    #[instrument(skip(self, repo, body), fields(repo = %repo.full_name()))]
    async fn update_comment(&self, repo: &RepoRef, comment_id: u64, body: &str) -> Result<()> {
        let path = format!("repos/{}/{}/issues/comments/{}", repo.owner, repo.name, comment_id);
        self.send_json(Method::PATCH, repo, &path, json!({ "body": body })).await?;
        debug!("Comment updated");
        Ok(())
    }
}
