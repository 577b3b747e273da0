// src/main.rs
// proposal-police - flags issue comments that ignore the proposal template

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use proposal_police::{
    PoliceConfig,
    assistant::AssistantClient,
    classify::{ClassificationWorkflow, CommentContext, Outcome, PollPolicy, Verdict},
    handlers::prompt,
    state::create_app_state,
    webhook::create_router,
};

#[derive(Parser)]
#[command(name = "proposal-police")]
#[command(about = "GitHub App that checks issue comments against the proposal template")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server (default)
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Classify one comment against the configured assistant and print the verdicts.
    /// Nothing is written to GitHub.
    Classify {
        /// Comment body
        #[arg(short, long)]
        body: String,

        /// Comment author, substituted for {user}
        #[arg(short, long, default_value = "user")]
        author: String,

        /// Comment URL, substituted for {proposalLink}
        #[arg(short, long, default_value = "")]
        url: String,

        /// Body before the edit; classifies as an edited comment when given
        #[arg(long)]
        previous: Option<String>,
    },
}

fn init_tracing() -> Result<()> {
    let filter = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

async fn run_server(mut config: PoliceConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let bind_address = config.bind_address();
    let webhook_path = config.webhook_path.clone();
    let grace = config.shutdown_grace;

    let state = create_app_state(config).context("Failed to set up API clients")?;
    let registry = state.registry.clone();
    let metrics = state.metrics.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("proposal-police listening on http://{}{}", bind_address, webhook_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, waiting for {} pending jobs", registry.pending());
    let aborted = registry.shutdown(grace).await;
    if aborted > 0 {
        warn!("{} jobs were aborted before they finished", aborted);
    }
    metrics.report();
    info!("Shutdown complete");

    Ok(())
}

async fn run_classify(
    config: PoliceConfig,
    body: String,
    author: String,
    url: String,
    previous: Option<String>,
) -> Result<()> {
    let assistant_id = config.assistant_id()?.to_string();
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is required to classify")?;

    let client = AssistantClient::new(
        proposal_police::http::create_shared_client(),
        api_key,
        config.openai_base_url.clone(),
    );
    let workflow = ClassificationWorkflow::new(Arc::new(client), assistant_id, PollPolicy::from_config(&config));

    let request = match &previous {
        Some(previous) => prompt::edited_comment_request(Some(previous), &body),
        None => prompt::new_comment_request(&body),
    };
    let ctx = CommentContext {
        author,
        html_url: url,
        updated_at: chrono::Utc::now().to_rfc3339(),
    };

    match workflow.classify(&request, &ctx).await? {
        Outcome::Verdicts(verdicts) if verdicts.is_empty() => println!("(no assistant reply)"),
        Outcome::Verdicts(verdicts) => {
            for verdict in verdicts {
                match verdict {
                    Verdict::NoAction { context: None } => println!("NO_ACTION"),
                    Verdict::NoAction { context: Some(context) } => println!("NO_ACTION: {}", context),
                    Verdict::Directive { kind, payload } => println!("{} {}", kind.tag(), payload),
                    Verdict::Unrecognized(text) => println!("{}", text),
                }
            }
        }
        Outcome::JobFailed { status } => anyhow::bail!("assistant run ended with status {}", status),
        Outcome::TimedOut { ticks, elapsed } => {
            anyhow::bail!("assistant run still pending after {} polls ({:?})", ticks, elapsed)
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded before tracing so LOG_LEVEL can come from .env
    let dotenv = dotenvy::dotenv();
    init_tracing()?;
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!(".env file not found, using process environment only"),
    }

    let cli = Cli::parse();
    let config = PoliceConfig::from_env();

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Serve { host, port }) => run_server(config, host, port).await,
        Some(Commands::Classify {
            body,
            author,
            url,
            previous,
        }) => run_classify(config, body, author, url, previous).await,
    }
}
