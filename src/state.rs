// src/state.rs
// Shared state for the webhook server

use std::sync::Arc;
use std::time::Instant;

use crate::{
    assistant::{AssistantBackend, AssistantClient},
    classify::{ClassificationWorkflow, PollPolicy},
    config::PoliceConfig,
    error::Result,
    github::{GitHubApi, GitHubAuth, GitHubClient},
    handlers::CommentHandler,
    tasks::{JobMetrics, JobRegistry},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PoliceConfig>,
    pub handler: Arc<CommentHandler>,
    pub registry: JobRegistry,
    pub metrics: Arc<JobMetrics>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the handler from already-built collaborators
    pub fn assemble(
        config: Arc<PoliceConfig>,
        assistant: Arc<dyn AssistantBackend>,
        github: Arc<dyn GitHubApi>,
    ) -> Self {
        let registry = JobRegistry::new();
        let metrics = Arc::new(JobMetrics::new());
        let workflow = config.assistant_id().ok().map(|assistant_id| {
            Arc::new(ClassificationWorkflow::new(
                assistant,
                assistant_id,
                PollPolicy::from_config(&config),
            ))
        });
        let handler = Arc::new(CommentHandler::new(
            config.clone(),
            workflow,
            github,
            registry.clone(),
            metrics.clone(),
        ));

        Self {
            config,
            handler,
            registry,
            metrics,
            started_at: Instant::now(),
        }
    }
}

/// Build the real API clients from configuration
pub fn create_app_state(config: PoliceConfig) -> Result<AppState> {
    let http = crate::http::create_shared_client();
    let assistant = AssistantClient::new(
        http.clone(),
        config.openai_api_key.clone().unwrap_or_default(),
        config.openai_base_url.clone(),
    );
    let auth = GitHubAuth::from_config(&config)?;
    let github = GitHubClient::new(http, auth, config.github_api_url.clone());

    Ok(AppState::assemble(
        Arc::new(config),
        Arc::new(assistant),
        Arc::new(github),
    ))
}
