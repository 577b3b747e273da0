// src/error.rs
// Error taxonomy for proposal-police

use std::time::Duration;
use thiserror::Error;

/// Main error type for the proposal-police library
#[derive(Error, Debug)]
pub enum PoliceError {
    /// OPENAI_ASSISTANT_ID (or another required setting) is not configured
    #[error("configuration missing: {0}")]
    ConfigMissing(&'static str),

    /// The assistant rejected the job creation call
    #[error("job submission failed: {0}")]
    SubmissionFailed(String),

    /// A status or message listing call failed; the poll loop keeps going
    #[error("poll error: {0}")]
    Poll(String),

    /// An assistant message had no extractable text
    #[error("assistant message {message_id} has no text")]
    EmptyResponse { message_id: String },

    /// Edit directive received for a comment that already carries the marker
    #[error("comment {comment_id} was already edited by the bot")]
    AlreadyEdited { comment_id: u64 },

    #[error("job {job_id} did not complete after {ticks} polls ({elapsed:?})")]
    TimedOut {
        job_id: String,
        ticks: u32,
        elapsed: Duration,
    },

    #[error("webhook signature mismatch")]
    Signature,

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Convenience type alias for Result using PoliceError
pub type Result<T> = std::result::Result<T, PoliceError>;

impl PoliceError {
    /// Short, stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "config",
            Self::SubmissionFailed(_) => "submission",
            Self::Poll(_) => "poll",
            Self::EmptyResponse { .. } => "empty_response",
            Self::AlreadyEdited { .. } => "already_edited",
            Self::TimedOut { .. } => "timed_out",
            Self::Signature => "signature",
            Self::Auth(_) | Self::Jwt(_) => "auth",
            Self::Api { .. } | Self::Http(_) => "http",
            Self::Json(_) => "json",
        }
    }
}
