// src/assistant/mod.rs
// Assistant collaborator: submit a thread+run, poll it, read its messages

use async_trait::async_trait;

use crate::error::Result;

pub mod client;
pub mod types;

pub use client::AssistantClient;
pub use types::{Job, JobStatus, MessageRole, ThreadMessage};

/// Trait for the hosted assistant - the HTTP client and test fakes implement this
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create a thread seeded with `text` and start a run on it
    async fn create_job(&self, assistant_id: &str, text: &str) -> Result<Job>;

    /// Current status of the run behind `job`
    async fn job_status(&self, job: &Job) -> Result<JobStatus>;

    /// All messages on a thread, in the order the API returns them
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}
