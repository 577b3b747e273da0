// src/webhook/mod.rs
// GitHub webhook ingress and health endpoint

pub mod payload;
pub mod signature;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiError, ApiResult};
use crate::error::PoliceError;
use crate::handlers::{CommentKind, Disposition};
use crate::state::AppState;

pub use payload::IssueCommentEvent;

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Create the web server router
pub fn create_router(state: AppState) -> Router {
    let webhook_path = state.config.webhook_path.clone();
    Router::new()
        .route("/health", get(health))
        .route(&webhook_path, post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    let event = header(&headers, EVENT_HEADER).unwrap_or_default();
    let delivery = header(&headers, DELIVERY_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| format!("local-{}", Uuid::new_v4()));
    let delivery = delivery.as_str();

    if let Some(secret) = &state.config.webhook_secret {
        if let Err(e) = signature::verify(secret, &body, header(&headers, SIGNATURE_HEADER)) {
            warn!(delivery, event, "Rejected webhook: {}", e);
            state.metrics.record_error(e.kind());
            return Err(e.into());
        }
    }

    match event {
        "ping" => {
            info!(delivery, "Webhook ping");
            Ok(Json(json!({ "status": "pong" })))
        }
        "issue_comment" => {
            let payload: IssueCommentEvent = serde_json::from_slice(&body).map_err(|e| {
                warn!(delivery, "Malformed issue_comment payload: {}", e);
                ApiError::from(PoliceError::from(e))
            })?;

            if CommentKind::from_action(&payload.action).is_none() {
                debug!(delivery, action = %payload.action, "Ignoring issue_comment action");
                return Ok(Json(json!({ "status": "ignored" })));
            }

            info!(
                delivery,
                action = %payload.action,
                repo = %payload.repo_ref().full_name(),
                issue = payload.issue.number,
                comment_id = payload.comment.id,
                "issue_comment received"
            );

            match state.handler.handle(payload).await {
                Disposition::Queued { job_id } => Ok(Json(json!({ "status": "queued", "job_id": job_id }))),
                Disposition::Skipped(reason) => Ok(Json(json!({ "status": "skipped", "reason": reason.as_str() }))),
                Disposition::SubmissionFailed => {
                    Err(ApiError::bad_gateway("Could not submit classification job"))
                }
            }
        }
        other => {
            debug!(delivery, event = other, "Ignoring webhook event");
            Ok(Json(json!({ "status": "ignored" })))
        }
    }
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "pending_jobs": state.registry.pending(),
        "metrics": state.metrics.snapshot(),
    }))
}
