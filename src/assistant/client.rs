// src/assistant/client.rs
// Assistants API client over reqwest

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, instrument};

use super::types::{
    CreateThreadAndRunRequest, Job, JobStatus, ListMessagesResponse, RunResponse, ThreadMessage,
};
use super::AssistantBackend;
use crate::error::{PoliceError, Result};
use crate::http::check_status;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl AssistantClient {
    pub fn new(client: Client, api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
    }
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn create_job(&self, assistant_id: &str, text: &str) -> Result<Job> {
        let body = CreateThreadAndRunRequest::single_message(assistant_id, text);

        let response = self
            .request(Method::POST, "threads/runs")
            .json(&body)
            .send()
            .await
            .map_err(|e| PoliceError::SubmissionFailed(e.to_string()))?;

        let run: RunResponse = check_status(response)
            .await
            .map_err(|e| PoliceError::SubmissionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| PoliceError::SubmissionFailed(e.to_string()))?;

        debug!(thread_id = %run.thread_id, run_id = %run.id, "Created assistant run");
        Ok(Job::from(run))
    }

    async fn job_status(&self, job: &Job) -> Result<JobStatus> {
        let path = format!("threads/{}/runs/{}", job.thread_id, job.run_id);
        let response = self.request(Method::GET, &path).send().await?;
        let run: RunResponse = check_status(response).await?.json().await?;
        Ok(JobStatus::from(&run.status))
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let path = format!("threads/{}/messages", thread_id);
        let response = self.request(Method::GET, &path).send().await?;
        let list: ListMessagesResponse = check_status(response).await?.json().await?;
        if list.has_more {
            debug!(thread_id, "Thread has more messages than the first page");
        }
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }
}
