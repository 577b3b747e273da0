// src/classify/verdict.rs
// Verdict grammar: turns one assistant reply into a tagged outcome

use chrono::{DateTime, Utc};

use crate::assistant::MessageRole;

/// Bare reply meaning "nothing to do"
pub const NO_ACTION: &str = "NO_ACTION";
/// Tag for "nothing to do, but here is why" - the context is logged, never posted
pub const NO_ACTION_TAG: &str = "[NO_ACTION]";

pub const USER_PLACEHOLDER: &str = "{user}";
pub const PROPOSAL_LINK_PLACEHOLDER: &str = "{proposalLink}";
pub const TIMESTAMP_PLACEHOLDER: &str = "{added_timestamp}";

/// Control tags that ask the caller to write to GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Prepend the payload to the triggering comment
    EditComment,
    /// Post the payload as a new comment on the issue
    NewComment,
}

impl DirectiveKind {
    /// Checked in this order
    pub const ALL: [DirectiveKind; 2] = [DirectiveKind::EditComment, DirectiveKind::NewComment];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::EditComment => "[EDIT_COMMENT]",
            Self::NewComment => "[NEW_COMMENT]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NoAction { context: Option<String> },
    Directive { kind: DirectiveKind, payload: String },
    /// Untagged text, already cleaned and safe to post as-is
    Unrecognized(String),
}

impl Verdict {
    pub fn is_no_action(&self) -> bool {
        matches!(self, Verdict::NoAction { .. })
    }
}

/// Facts about the triggering comment used to fill reply placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContext {
    pub author: String,
    pub html_url: String,
    /// ISO-8601 last-modified time of the comment
    pub updated_at: String,
}

impl CommentContext {
    /// Replace every placeholder occurrence
    pub fn substitute(&self, text: &str) -> String {
        text.replace(USER_PLACEHOLDER, &format!("@{}", self.author))
            .replace(PROPOSAL_LINK_PLACEHOLDER, &self.html_url)
            .replace(TIMESTAMP_PLACEHOLDER, &format_timestamp(&self.updated_at))
    }
}

/// `2024-01-24T13:15:24.000Z` -> `2024-01-24 13:15:24 UTC`
pub fn format_timestamp(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => {
            let trimmed = iso.split('.').next().unwrap_or(iso).trim_end_matches('Z');
            format!("{} UTC", trimmed.replacen('T', " ", 1))
        }
    }
}

/// Drop one pair of surrounding double quotes, or a lone leading one
fn strip_quotes(text: &str) -> &str {
    match text.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').unwrap_or(rest),
        None => text,
    }
}

/// Text following `tag`, minus one leading space
fn after_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let idx = text.find(tag)?;
    let rest = &text[idx + tag.len()..];
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn is_bare_no_action(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == NO_ACTION
        || trimmed
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .is_some_and(|t| t == NO_ACTION)
}

/// Classify one reply. Precedence: bare NO_ACTION, user-authored message,
/// `[NO_ACTION]` with context, directive tags, then untagged text.
pub fn parse_reply(role: MessageRole, text: &str, ctx: &CommentContext) -> Verdict {
    if is_bare_no_action(text) {
        return Verdict::NoAction { context: None };
    }

    // Our own prompt echoed back in the thread
    if role == MessageRole::User {
        return Verdict::NoAction { context: None };
    }

    if let Some(rest) = after_tag(text, NO_ACTION_TAG) {
        let context = rest.replace('"', "").trim().to_string();
        return Verdict::NoAction {
            context: (!context.is_empty()).then_some(context),
        };
    }

    for kind in DirectiveKind::ALL {
        if let Some(rest) = after_tag(text, kind.tag()) {
            let payload = ctx.substitute(strip_quotes(rest.trim_end()));
            return Verdict::Directive { kind, payload };
        }
    }

    Verdict::Unrecognized(ctx.substitute(text).replace('"', ""))
}
