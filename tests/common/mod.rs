// tests/common/mod.rs
// Shared fakes and fixtures for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Value, json};

use proposal_police::{
    PoliceConfig, PoliceError, Result,
    assistant::{AssistantBackend, Job, JobStatus, MessageRole, ThreadMessage},
    github::{GitHubApi, RepoRef},
};

/// Assistant fake: fixed status script, fixed thread, records submitted prompts
#[derive(Default)]
pub struct ScriptedAssistant {
    pub statuses: Mutex<VecDeque<JobStatus>>,
    pub messages: Vec<ThreadMessage>,
    pub fail_submit: bool,
    pub submitted: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn replying(statuses: Vec<JobStatus>, messages: Vec<ThreadMessage>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            messages,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_submit: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl AssistantBackend for ScriptedAssistant {
    async fn create_job(&self, _assistant_id: &str, text: &str) -> Result<Job> {
        if self.fail_submit {
            return Err(PoliceError::Api {
                status: 500,
                body: "upstream down".into(),
            });
        }
        let n = {
            let mut submitted = self.submitted.lock();
            submitted.push(text.to_string());
            submitted.len()
        };
        Ok(Job {
            thread_id: format!("thread_{n}"),
            run_id: format!("run_{n}"),
            status: JobStatus::Pending,
            created_at: Utc::now(),
        })
    }

    async fn job_status(&self, _job: &Job) -> Result<JobStatus> {
        Ok(self.statuses.lock().pop_front().unwrap_or(JobStatus::Pending))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Ok(self.messages.clone())
    }
}

/// GitHub fake that records every write
#[derive(Default)]
pub struct RecordingGitHub {
    pub created: Mutex<Vec<(String, u64, String)>>,
    pub updated: Mutex<Vec<(String, u64, String)>>,
}

impl RecordingGitHub {
    pub fn writes(&self) -> usize {
        self.created.lock().len() + self.updated.lock().len()
    }
}

#[async_trait]
impl GitHubApi for RecordingGitHub {
    async fn create_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        self.created.lock().push((repo.full_name(), issue_number, body.to_string()));
        Ok(())
    }

    async fn update_comment(&self, repo: &RepoRef, comment_id: u64, body: &str) -> Result<()> {
        self.updated.lock().push((repo.full_name(), comment_id, body.to_string()));
        Ok(())
    }
}

pub fn assistant_message(text: &str) -> ThreadMessage {
    ThreadMessage {
        id: "msg_assistant".into(),
        role: MessageRole::Assistant,
        text_segments: vec![text.to_string()],
    }
}

pub fn user_message(text: &str) -> ThreadMessage {
    ThreadMessage {
        id: "msg_user".into(),
        role: MessageRole::User,
        text_segments: vec![text.to_string()],
    }
}

/// Configured assistant, fast polling, no jitter
pub fn test_config() -> PoliceConfig {
    PoliceConfig {
        openai_assistant_id: Some("asst_test".into()),
        poll_interval: Duration::from_millis(1),
        poll_max_interval: Duration::from_millis(5),
        poll_max_ticks: 10,
        poll_timeout: Duration::from_secs(5),
        poll_jitter: 0.0,
        ..PoliceConfig::default()
    }
}

pub fn comment_event(action: &str, body: &str, previous: Option<&str>) -> Value {
    let mut event = json!({
        "action": action,
        "issue": {
            "number": 42,
            "state": "open",
            "labels": [{ "name": "Help Wanted" }]
        },
        "comment": {
            "id": 1001,
            "body": body,
            "html_url": "https://github.com/acme/app/issues/42#issuecomment-1001",
            "updated_at": "2024-01-24T13:15:24.000Z",
            "user": { "login": "alice", "type": "User" }
        },
        "repository": { "name": "app", "owner": { "login": "acme" } },
        "installation": { "id": 7 },
        "sender": { "login": "alice", "type": "User" }
    });
    if let Some(previous) = previous {
        event["changes"] = json!({ "body": { "from": previous } });
    }
    event
}
