// src/webhook/payload.rs
// The parts of the `issue_comment` webhook payload the bot reads

use serde::Deserialize;

use crate::classify::CommentContext;
use crate::github::RepoRef;

#[derive(Deserialize, Debug, Clone)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
    #[serde(default)]
    pub changes: Option<Changes>,
    pub repository: Repository,
    #[serde(default)]
    pub installation: Option<Installation>,
    /// Account that triggered the delivery; for an edit this is the editor
    #[serde(default)]
    pub sender: Option<User>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Issue {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Label {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub html_url: String,
    pub updated_at: String,
    pub user: User,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub login: String,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Changes {
    #[serde(default)]
    pub body: Option<ChangedValue>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangedValue {
    pub from: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Installation {
    pub id: u64,
}

impl IssueCommentEvent {
    pub fn is_issue_open(&self) -> bool {
        self.issue.state == "open"
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.issue.labels.iter().any(|label| label.name == name)
    }

    pub fn is_bot_comment(&self) -> bool {
        self.comment.user.account_type.as_deref() == Some("Bot")
    }

    /// True when a bot (this App included) made the change being reported
    pub fn is_bot_sender(&self) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.account_type.as_deref() == Some("Bot"))
    }

    /// Body before the edit, for `edited` events
    pub fn previous_body(&self) -> Option<&str> {
        self.changes
            .as_ref()
            .and_then(|c| c.body.as_ref())
            .map(|b| b.from.as_str())
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef {
            owner: self.repository.owner.login.clone(),
            name: self.repository.name.clone(),
            installation_id: self.installation.as_ref().map(|i| i.id),
        }
    }

    pub fn comment_context(&self) -> CommentContext {
        CommentContext {
            author: self.comment.user.login.clone(),
            html_url: self.comment.html_url.clone(),
            updated_at: self.comment.updated_at.clone(),
        }
    }
}
