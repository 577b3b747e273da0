// src/assistant/types.rs
// Wire types for the Assistants API (threads / runs / messages)

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Message role in a thread
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message seeded into a new thread
#[derive(Serialize, Debug)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct ThreadSeed {
    pub messages: Vec<CreateMessageRequest>,
}

/// Body of `POST /threads/runs`
#[derive(Serialize, Debug)]
pub struct CreateThreadAndRunRequest {
    pub assistant_id: String,
    pub thread: ThreadSeed,
}

impl CreateThreadAndRunRequest {
    pub fn single_message(assistant_id: &str, content: &str) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            thread: ThreadSeed {
                messages: vec![CreateMessageRequest {
                    role: MessageRole::User,
                    content: content.to_string(),
                }],
            },
        }
    }
}

/// Run status values
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

/// Response from creating or retrieving a run
#[derive(Deserialize, Debug)]
pub struct RunResponse {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// List messages response
#[derive(Deserialize, Debug)]
pub struct ListMessagesResponse {
    pub data: Vec<MessageResponse>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Deserialize, Debug)]
pub struct MessageResponse {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// Content within a message
#[derive(Deserialize, Debug)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<TextContent>,
}

/// Text content details
#[derive(Deserialize, Debug)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

/// Where a job is in its lifecycle, as far as the workflow cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed(String),
}

impl From<&RunStatus> for JobStatus {
    fn from(status: &RunStatus) -> Self {
        match status {
            RunStatus::Completed => JobStatus::Completed,
            RunStatus::Failed => JobStatus::Failed("failed".into()),
            RunStatus::Cancelled => JobStatus::Failed("cancelled".into()),
            RunStatus::Expired => JobStatus::Failed("expired".into()),
            RunStatus::Incomplete => JobStatus::Failed("incomplete".into()),
            RunStatus::Queued
            | RunStatus::InProgress
            | RunStatus::RequiresAction
            | RunStatus::Cancelling
            | RunStatus::Unknown => JobStatus::Pending,
        }
    }
}

/// One outstanding remote classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub thread_id: String,
    pub run_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl From<RunResponse> for Job {
    fn from(run: RunResponse) -> Self {
        let created_at = run
            .created_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);
        Self {
            status: JobStatus::from(&run.status),
            thread_id: run.thread_id,
            run_id: run.id,
            created_at,
        }
    }
}

/// A thread message reduced to what classification needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub text_segments: Vec<String>,
}

impl ThreadMessage {
    /// First text segment, if it has any content
    pub fn first_text(&self) -> Option<&str> {
        self.text_segments
            .first()
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

impl From<MessageResponse> for ThreadMessage {
    fn from(message: MessageResponse) -> Self {
        let text_segments = message
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.map(|t| t.value))
            .collect();
        Self {
            id: message.id,
            role: message.role,
            text_segments,
        }
    }
}
