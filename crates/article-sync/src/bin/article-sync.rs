//! Article sync service binary.
//!
//! Standalone HTTP service receiving GitHub push webhooks.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use article_sync::{
    config::Config, server, ContentfulClient, GcsClient, GitHubClient, SyncSettings,
    SyncWorkflow, TokenSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("Starting article sync service...");

    // Load configuration
    let config = Config::default();
    config.validate().context("Invalid configuration")?;

    if !config.enabled {
        error!("SYNC_ENABLED is false. Service will not process webhooks.");
    }
    if config.webhook_secret.is_none() {
        warn!("No WEBHOOK_SECRET configured - webhook signatures will not be verified");
    }

    let workflow = build_workflow(&config)?;

    // Build application state
    let state = server::AppState {
        config: config.clone(),
        workflow: Arc::new(workflow),
    };

    // Build router
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Article sync service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("article_sync=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

/// Construct the three clients once and wire them into the workflow.
fn build_workflow(config: &Config) -> Result<SyncWorkflow> {
    let github = GitHubClient::new(config.github.token.as_deref(), &config.github.api_url)
        .context("Failed to create GitHub client")?;
    if config.github.token.is_none() {
        info!("No GITHUB_TOKEN configured - contents are read anonymously");
    }

    let cms = &config.cms;
    let (Some(access_token), Some(space_id)) = (&cms.access_token, &cms.space_id) else {
        anyhow::bail!("Contentful credentials missing");
    };
    let contentful = ContentfulClient::new(access_token, &cms.api_url, space_id, &cms.environment)
        .context("Failed to create Contentful client")?;
    info!(space_id = %space_id, environment = %cms.environment, "Contentful client configured");

    let storage = &config.storage;
    let bucket = storage.bucket.as_deref().context("GCS_NAME is not set")?;
    let tokens = match (&storage.access_token, &storage.key_path) {
        (Some(token), _) => TokenSource::fixed(token.clone()),
        (None, Some(path)) => {
            TokenSource::from_key_file(path).context("Failed to load service account key")?
        }
        (None, None) => anyhow::bail!("No Cloud Storage credentials configured"),
    };
    let gcs = GcsClient::new(&storage.api_url, bucket, tokens)
        .context("Failed to create Cloud Storage client")?;
    info!(
        bucket = %gcs.bucket(),
        project_id = storage.project_id.as_deref().unwrap_or("unset"),
        "Cloud Storage client configured"
    );

    Ok(SyncWorkflow::new(
        Arc::new(github),
        Arc::new(contentful),
        Arc::new(gcs),
        SyncSettings::from_config(config),
    ))
}
