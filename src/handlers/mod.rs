// src/handlers/mod.rs

//! Issue-comment event handling: decide whether a comment is worth
//! classifying, start the job, and act on the verdicts once it finishes.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::assistant::Job;
use crate::classify::{ClassificationWorkflow, DirectiveKind, Outcome, Verdict};
use crate::config::PoliceConfig;
use crate::error::PoliceError;
use crate::github::GitHubApi;
use crate::tasks::{JobMetrics, JobRegistry};
use crate::webhook::payload::IssueCommentEvent;

pub mod prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Created,
    Edited,
}

impl CommentKind {
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "created" => Some(Self::Created),
            "edited" => Some(Self::Edited),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "issue_comment.created",
            Self::Edited => "issue_comment.edited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedAction,
    IssueClosed,
    MissingLabel,
    BotAuthor,
    AssistantNotConfigured,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedAction => "unsupported_action",
            Self::IssueClosed => "issue_closed",
            Self::MissingLabel => "missing_label",
            Self::BotAuthor => "bot_author",
            Self::AssistantNotConfigured => "assistant_not_configured",
        }
    }
}

/// What happened to an event by the time the webhook request returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Skipped(SkipReason),
    Queued { job_id: String },
    SubmissionFailed,
}

/// What a single verdict turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CommentCreated,
    CommentEdited,
    Nothing,
}

/// Body for an edited comment: the notice, a blank line, then the original text.
/// When the notice does not carry `marker`, it is appended as a hidden HTML comment
/// so the next edit event for this comment is recognised as already handled.
pub fn edited_body(notice: &str, original: &str, prefix: Option<&str>, marker: &str) -> String {
    let head = match prefix {
        Some(prefix) => format!("{prefix}: {notice}"),
        None => notice.to_string(),
    };
    if head.contains(marker) {
        format!("{head}\n\n{original}")
    } else {
        format!("{head}\n\n{original}\n\n<!-- {marker} -->")
    }
}

/// Applies verdicts to GitHub
#[derive(Clone)]
pub struct Responder {
    github: Arc<dyn GitHubApi>,
    config: Arc<PoliceConfig>,
    metrics: Arc<JobMetrics>,
}

impl Responder {
    pub fn new(github: Arc<dyn GitHubApi>, config: Arc<PoliceConfig>, metrics: Arc<JobMetrics>) -> Self {
        Self { github, config, metrics }
    }

    pub async fn apply(&self, kind: CommentKind, event: &IssueCommentEvent, verdicts: &[Verdict]) -> Vec<Action> {
        let mut actions = Vec::with_capacity(verdicts.len());
        for verdict in verdicts {
            actions.push(self.apply_one(kind, event, verdict).await);
        }
        actions
    }

    async fn apply_one(&self, kind: CommentKind, event: &IssueCommentEvent, verdict: &Verdict) -> Action {
        match (verdict, kind) {
            (Verdict::NoAction { context: Some(context) }, _) => {
                info!(event = kind.as_str(), context = %context, "NO_ACTION with context");
                self.metrics.record("no_action");
                Action::Nothing
            }
            (Verdict::NoAction { context: None }, _) => {
                debug!(event = kind.as_str(), "NO_ACTION");
                self.metrics.record("no_action");
                Action::Nothing
            }
            (Verdict::Directive { kind: DirectiveKind::NewComment, payload }, _)
            | (Verdict::Unrecognized(payload), CommentKind::Created) => self.create_comment(event, payload).await,
            (Verdict::Directive { kind: DirectiveKind::EditComment, payload }, CommentKind::Edited) => {
                self.edit_comment(event, payload).await
            }
            (Verdict::Directive { kind: DirectiveKind::EditComment, .. }, CommentKind::Created) => {
                debug!(comment_id = event.comment.id, "Edit directive on a new comment, ignoring");
                Action::Nothing
            }
            (Verdict::Unrecognized(text), CommentKind::Edited) => {
                debug!(comment_id = event.comment.id, reply = %text, "Untagged reply to an edit, ignoring");
                Action::Nothing
            }
        }
    }

    async fn create_comment(&self, event: &IssueCommentEvent, body: &str) -> Action {
        if body.trim().is_empty() {
            info!(comment_id = event.comment.id, "Reply is empty after cleanup, not posting");
            return Action::Nothing;
        }

        let repo = event.repo_ref();
        match self.github.create_comment(&repo, event.issue.number, body).await {
            Ok(()) => {
                info!(repo = %repo.full_name(), issue = event.issue.number, "proposal-police posts comment");
                self.metrics.record("comment_created");
                Action::CommentCreated
            }
            Err(e) => {
                error!(repo = %repo.full_name(), issue = event.issue.number, error = %e, "Failed to create comment");
                self.metrics.record_error(e.kind());
                Action::Nothing
            }
        }
    }

    async fn edit_comment(&self, event: &IssueCommentEvent, notice: &str) -> Action {
        let comment_id = event.comment.id;
        if event.comment.body.contains(&self.config.edit_marker) {
            let err = PoliceError::AlreadyEdited { comment_id };
            info!("{}", err);
            self.metrics.record_error(err.kind());
            return Action::Nothing;
        }

        let body = edited_body(
            notice,
            &event.comment.body,
            self.config.edit_notice_prefix.as_deref(),
            &self.config.edit_marker,
        );
        let repo = event.repo_ref();
        match self.github.update_comment(&repo, comment_id, &body).await {
            Ok(()) => {
                info!(repo = %repo.full_name(), comment_id, "proposal-police edits comment");
                self.metrics.record("comment_edited");
                Action::CommentEdited
            }
            Err(e) => {
                error!(repo = %repo.full_name(), comment_id, error = %e, "Failed to update comment");
                self.metrics.record_error(e.kind());
                Action::Nothing
            }
        }
    }
}

pub struct CommentHandler {
    config: Arc<PoliceConfig>,
    workflow: Option<Arc<ClassificationWorkflow>>,
    responder: Responder,
    registry: JobRegistry,
    metrics: Arc<JobMetrics>,
}

impl CommentHandler {
    /// `workflow` is `None` when no assistant id is configured; every event is then skipped
    pub fn new(
        config: Arc<PoliceConfig>,
        workflow: Option<Arc<ClassificationWorkflow>>,
        github: Arc<dyn GitHubApi>,
        registry: JobRegistry,
        metrics: Arc<JobMetrics>,
    ) -> Self {
        let responder = Responder::new(github, config.clone(), metrics.clone());
        Self {
            config,
            workflow,
            responder,
            registry,
            metrics,
        }
    }

    fn gate(&self, event: &IssueCommentEvent) -> Result<(), SkipReason> {
        if !event.is_issue_open() {
            return Err(SkipReason::IssueClosed);
        }
        if self.config.label_gate && !event.has_label(&self.config.required_label) {
            return Err(SkipReason::MissingLabel);
        }
        if self.config.ignore_bots && (event.is_bot_comment() || event.is_bot_sender()) {
            return Err(SkipReason::BotAuthor);
        }
        Ok(())
    }

    /// Submit a classification job for `event` and leave the rest to a registered
    /// background task. Returns once the job is submitted (or skipped).
    pub async fn handle(&self, event: IssueCommentEvent) -> Disposition {
        let Some(kind) = CommentKind::from_action(&event.action) else {
            return Disposition::Skipped(SkipReason::UnsupportedAction);
        };

        if let Err(reason) = self.gate(&event) {
            debug!(event = kind.as_str(), comment_id = event.comment.id, reason = ?reason, "Skipping comment");
            return Disposition::Skipped(reason);
        }

        let Some(workflow) = self.workflow.clone() else {
            let err = PoliceError::ConfigMissing("OPENAI_ASSISTANT_ID");
            warn!(event = kind.as_str(), "{}", err);
            self.metrics.record_error(err.kind());
            return Disposition::Skipped(SkipReason::AssistantNotConfigured);
        };

        let request = match kind {
            CommentKind::Created => prompt::new_comment_request(&event.comment.body),
            CommentKind::Edited => prompt::edited_comment_request(event.previous_body(), &event.comment.body),
        };

        let job = match workflow.submit(&request).await {
            Ok(job) => job,
            Err(e) => {
                error!(event = kind.as_str(), error = %e, "Could not start classification");
                self.metrics.record_error(e.kind());
                return Disposition::SubmissionFailed;
            }
        };
        self.metrics.record("submitted");

        let job_id = job.run_id.clone();
        let responder = self.responder.clone();
        let metrics = self.metrics.clone();
        self.registry.spawn(job_id.clone(), async move {
            follow_up(workflow, responder, metrics, kind, event, job).await;
        });

        Disposition::Queued { job_id }
    }
}

/// Wait for `job` and act on what it says
async fn follow_up(
    workflow: Arc<ClassificationWorkflow>,
    responder: Responder,
    metrics: Arc<JobMetrics>,
    kind: CommentKind,
    event: IssueCommentEvent,
    job: Job,
) {
    let started = Instant::now();
    let ctx = event.comment_context();

    match workflow.await_verdicts(&job, &ctx).await {
        Ok(Outcome::Verdicts(verdicts)) => {
            metrics.record("completed");
            let actions = responder.apply(kind, &event, &verdicts).await;
            debug!(job_id = %job.run_id, actions = ?actions, "Job handled");
        }
        Ok(Outcome::JobFailed { status }) => {
            debug!(job_id = %job.run_id, status = %status, "Job failed, nothing to do");
            metrics.record("failed");
        }
        Ok(Outcome::TimedOut { ticks, elapsed }) => {
            let err = PoliceError::TimedOut {
                job_id: job.run_id.clone(),
                ticks,
                elapsed,
            };
            warn!("{}", err);
            metrics.record("timed_out");
        }
        Err(e) => {
            error!(job_id = %job.run_id, error = %e, "Could not read classification result");
            metrics.record_error(e.kind());
        }
    }

    metrics.record_job_duration(started.elapsed());
}
