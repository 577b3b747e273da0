// tests/webhook_router.rs
// HTTP surface: signature checks, event routing, health

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{RecordingGitHub, ScriptedAssistant, assistant_message, comment_event, test_config};
use proposal_police::{
    PoliceConfig, assistant::JobStatus, state::AppState, webhook::create_router, webhook::signature,
};

const SECRET: &str = "webhook-secret";
const WEBHOOK_PATH: &str = "/api/github/webhooks";

fn secured_config() -> PoliceConfig {
    PoliceConfig {
        webhook_secret: Some(SECRET.into()),
        ..test_config()
    }
}

fn state_with(config: PoliceConfig, assistant: Arc<ScriptedAssistant>, github: Arc<RecordingGitHub>) -> AppState {
    AppState::assemble(Arc::new(config), assistant, github)
}

fn webhook_request(event: &str, body: &[u8], signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-github-delivery", "delivery-1");
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

fn signed(event: &str, body: &[u8]) -> Request<Body> {
    webhook_request(event, body, Some(signature::sign(SECRET, body).unwrap()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn idle_state(config: PoliceConfig) -> AppState {
    state_with(
        config,
        ScriptedAssistant::replying(vec![], vec![]),
        Arc::new(RecordingGitHub::default()),
    )
}

#[tokio::test]
async fn ping_is_answered() {
    let app = create_router(idle_state(secured_config()));
    let (status, body) = send(app, signed("ping", br#"{"zen":"Keep it logically awesome."}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "pong" }));
}

#[tokio::test]
async fn bad_or_missing_signature_is_rejected() {
    let state = idle_state(secured_config());
    let body = br#"{"zen":"hi"}"#;

    let (status, _) = send(create_router(state.clone()), webhook_request("ping", body, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = signature::sign("not-the-secret", body).unwrap();
    let (status, body) = send(create_router(state.clone()), webhook_request("ping", body, Some(forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
    assert_eq!(state.metrics.error_count("signature"), 2);
}

#[tokio::test]
async fn unsigned_requests_accepted_without_secret() {
    let app = create_router(idle_state(test_config()));
    let (status, body) = send(app, webhook_request("ping", b"{}", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pong");
}

#[tokio::test]
async fn other_events_and_actions_are_ignored() {
    let state = idle_state(secured_config());

    let (status, body) = send(create_router(state.clone()), signed("issues", br#"{"action":"opened"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");

    let deleted = serde_json::to_vec(&comment_event("deleted", "bye", None)).unwrap();
    let (status, body) = send(create_router(state), signed("issue_comment", &deleted)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn malformed_payload_is_bad_request() {
    let app = create_router(idle_state(secured_config()));
    let (status, body) = send(app, signed("issue_comment", b"{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "BAD_REQUEST");
}

#[tokio::test]
async fn comment_is_queued_and_answered() {
    let github = Arc::new(RecordingGitHub::default());
    let assistant = ScriptedAssistant::replying(
        vec![JobStatus::Completed],
        vec![assistant_message("{user} please follow the proposal template")],
    );
    let state = state_with(secured_config(), assistant, github.clone());

    let payload = serde_json::to_vec(&comment_event("created", "I'll take this", None)).unwrap();
    let (status, body) = send(create_router(state.clone()), signed("issue_comment", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "queued", "job_id": "run_1" }));

    assert_eq!(state.registry.shutdown(Duration::from_secs(5)).await, 0);
    assert_eq!(
        *github.created.lock(),
        vec![("acme/app".to_string(), 42, "@alice please follow the proposal template".to_string())]
    );
}

#[tokio::test]
async fn skipped_comment_reports_reason() {
    let app = create_router(idle_state(secured_config()));
    let mut event = comment_event("created", "hi", None);
    event["issue"]["state"] = json!("closed");
    let payload = serde_json::to_vec(&event).unwrap();

    let (status, body) = send(app, signed("issue_comment", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "skipped", "reason": "issue_closed" }));
}

#[tokio::test]
async fn submission_failure_is_bad_gateway() {
    let state = state_with(
        secured_config(),
        ScriptedAssistant::failing(),
        Arc::new(RecordingGitHub::default()),
    );
    let payload = serde_json::to_vec(&comment_event("created", "hi", None)).unwrap();

    let (status, _) = send(create_router(state), signed("issue_comment", &payload)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_reports_version_and_metrics() {
    let app = create_router(idle_state(test_config()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["pending_jobs"], 0);
    assert!(body["metrics"]["events"].is_object());
}
