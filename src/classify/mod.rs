// src/classify/mod.rs

//! Classification workflow: submit a request to the assistant, wait for the
//! run to finish, and turn its reply into verdicts the caller can act on.
//! Nothing in here writes to GitHub.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::assistant::{AssistantBackend, Job};
use crate::error::{PoliceError, Result};

pub mod poll;
pub mod verdict;

pub use poll::{PollOutcome, PollPolicy, poll_until_terminal};
pub use verdict::{CommentContext, DirectiveKind, Verdict, format_timestamp, parse_reply};

/// Instruction plus comment content, sent verbatim as the thread's only message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    text: String,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Result of watching a job to the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One verdict per assistant message that carried text
    Verdicts(Vec<Verdict>),
    JobFailed { status: String },
    TimedOut { ticks: u32, elapsed: Duration },
}

pub struct ClassificationWorkflow {
    backend: Arc<dyn AssistantBackend>,
    assistant_id: String,
    policy: PollPolicy,
}

impl ClassificationWorkflow {
    pub fn new(backend: Arc<dyn AssistantBackend>, assistant_id: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            backend,
            assistant_id: assistant_id.into(),
            policy,
        }
    }

    /// Start a job for `request`. Any failure is reported as `SubmissionFailed`.
    pub async fn submit(&self, request: &ClassificationRequest) -> Result<Job> {
        let job = self
            .backend
            .create_job(&self.assistant_id, request.text())
            .await
            .map_err(|e| match e {
                PoliceError::SubmissionFailed(_) => e,
                other => PoliceError::SubmissionFailed(other.to_string()),
            })?;
        info!(thread_id = %job.thread_id, job_id = %job.run_id, "Classification job submitted");
        Ok(job)
    }

    /// Poll `job` until it is terminal, then read and parse the thread.
    /// Only a failed message listing is returned as an error.
    pub async fn await_verdicts(&self, job: &Job, ctx: &CommentContext) -> Result<Outcome> {
        let backend = self.backend.clone();
        let outcome = poll_until_terminal(&self.policy, &job.run_id, || {
            let backend = backend.clone();
            let job = job.clone();
            async move { backend.job_status(&job).await }
        })
        .await;

        match outcome {
            PollOutcome::Completed { ticks } => {
                debug!(job_id = %job.run_id, ticks, "Fetching thread messages");
            }
            PollOutcome::Failed { status, ticks } => {
                warn!(job_id = %job.run_id, ticks, status = %status, "Classification job ended without completing");
                return Ok(Outcome::JobFailed { status });
            }
            PollOutcome::TimedOut { ticks, elapsed } => {
                warn!(job_id = %job.run_id, ticks, elapsed = ?elapsed, "Gave up waiting for classification job");
                return Ok(Outcome::TimedOut { ticks, elapsed });
            }
        }

        let messages = self
            .backend
            .list_messages(&job.thread_id)
            .await
            .map_err(|e| PoliceError::Poll(format!("listing messages for {}: {}", job.thread_id, e)))?;

        let mut verdicts = Vec::new();
        for message in &messages {
            let Some(text) = message.first_text() else {
                let empty = PoliceError::EmptyResponse {
                    message_id: message.id.clone(),
                };
                info!(job_id = %job.run_id, "{}", empty);
                continue;
            };
            debug!(job_id = %job.run_id, role = ?message.role, reply = text, "Assistant thread message");
            verdicts.push(parse_reply(message.role, text, ctx));
        }

        Ok(Outcome::Verdicts(verdicts))
    }

    /// Submit and wait in one call
    pub async fn classify(&self, request: &ClassificationRequest, ctx: &CommentContext) -> Result<Outcome> {
        let job = self.submit(request).await?;
        self.await_verdicts(&job, ctx).await
    }
}
