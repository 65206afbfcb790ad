//! HTTP server for GitHub push webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::sync::SyncWorkflow;
use crate::webhooks::{verify_webhook_signature, PushEvent, WebhookHeaders};

/// GitHub caps webhook payloads at 25 MiB.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Sync workflow shared by every delivery.
    pub workflow: Arc<SyncWorkflow>,
}

/// Build the HTTP router for the sync service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        // Manual re-sync of a push payload, waits for the report
        .route("/trigger/sync", post(trigger_sync))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if !state.config.enabled {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Reject the request unless it carries a valid signature.
///
/// Passes when no secret is configured.
fn authorize(config: &Config, headers: &WebhookHeaders, body: &[u8]) -> Result<(), StatusCode> {
    let Some(secret) = &config.webhook_secret else {
        return Ok(());
    };

    let Some(signature) = &headers.signature else {
        warn!("Missing X-Hub-Signature-256 header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !verify_webhook_signature(body, signature, secret) {
        warn!("Invalid webhook signature");
        return Err(StatusCode::UNAUTHORIZED);
    }
    debug!("Webhook signature verified");
    Ok(())
}

fn parse_push(body: &[u8]) -> Result<PushEvent, StatusCode> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Failed to parse push payload: {e}");
        StatusCode::BAD_REQUEST
    })
}

fn read_headers(headers: &HeaderMap) -> WebhookHeaders {
    WebhookHeaders::from_header_map(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    })
}

fn ignored(reason: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ignored",
            "reason": reason
        })),
    )
}

/// Handle incoming GitHub webhooks.
///
/// This handler:
/// 1. Verifies webhook signature (if secret configured)
/// 2. Ignores everything but pushes to the configured branch
/// 3. Starts the sync in the background and acknowledges immediately
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    if !state.config.enabled {
        debug!("Sync is disabled, ignoring webhook");
        return Ok(ignored("sync_disabled"));
    }

    let headers = read_headers(&headers);
    let delivery_id = headers.delivery_id.as_deref().unwrap_or("unknown");
    let event_type = headers.event_type.as_deref().unwrap_or("unknown");

    info!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received GitHub webhook"
    );

    authorize(&state.config, &headers, &body)?;

    if event_type != "push" {
        debug!(event_type = %event_type, "Ignoring non-push event");
        return Ok(ignored("unhandled_event_type"));
    }

    let push = parse_push(&body)?;

    if let Some(wanted) = &state.config.branch {
        if push.branch() != Some(wanted.as_str()) {
            debug!(
                git_ref = %push.git_ref,
                branch = %wanted,
                "Ignoring push to other ref"
            );
            return Ok(ignored("other_branch"));
        }
    }

    let changes = state.workflow.changes(&push);
    let (articles, images) = (changes.article_count(), changes.image_count());
    if changes.is_empty() {
        debug!(delivery_id = %delivery_id, "Push touches no synced paths");
        return Ok(ignored("no_synced_paths"));
    }

    let run_id = delivery_id.to_string();
    let workflow = Arc::clone(&state.workflow);
    tokio::spawn(async move {
        let report = workflow.run(&push).await;
        report.log(&run_id);
    });

    info!(
        delivery_id = %delivery_id,
        articles,
        images,
        "Sync started"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "delivery_id": delivery_id,
            "articles": articles,
            "images": images
        })),
    ))
}

/// Run the sync for a push payload and return its report.
async fn trigger_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let headers = read_headers(&headers);
    authorize(&state.config, &headers, &body)?;

    if !state.config.enabled {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let push = parse_push(&body)?;
    let run_id = uuid::Uuid::new_v4().to_string();
    info!(run_id = %run_id, "Manual sync trigger requested");

    let report = state.workflow.run(&push).await;
    report.log(&run_id);

    let mut value = report.to_json();
    value["run_id"] = json!(run_id);
    Ok(Json(value))
}
