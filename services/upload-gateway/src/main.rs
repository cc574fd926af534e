//! Asset Upload Gateway
//!
//! Single-binary Rust service that:
//! 1. Loads a pool of API keys and the upload settings
//! 2. Accepts batches of attachments on `POST /v1/uploads`
//! 3. Uploads each one under the first key with quota left, retrying on failure
//! 4. Replies with a per-asset report

mod config;
mod error;
mod intake;
mod metrics;

use anyhow::{Context, Result};
use asset_upload::{AssetSubmitter, OperationPoller, UploadOrchestrator, UploadSettings};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use cloud_api::{AssetService, CloudClient, QuotaQuery};
use quota_pool::{CredentialSelector, CredentialSet, QuotaCache, QuotaProbe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::intake::IntakeState;

/// Time allowed for in-flight batches to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    intake: IntakeState,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/v1/uploads", post(upload_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(intake::MAX_BODY_BYTES))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Wire the pipeline from configuration over the given remote service.
fn build_orchestrator(config: &Config, service: Arc<dyn AssetService>) -> Result<UploadOrchestrator> {
    let upload = &config.upload;

    let credentials = CredentialSet::new(config.pool_credentials())
        .context("invalid credential pool")?;

    let probe = QuotaProbe::new(
        service.clone(),
        QuotaQuery::uploads(upload.asset_type),
        upload.quota_cache_period(),
    );
    let selector = CredentialSelector::new(Arc::new(QuotaCache::new()), probe);
    let submitter = AssetSubmitter::new(service.clone(), upload.asset_type, upload.description.clone());
    let poller = OperationPoller::new(service, upload.poll_interval(), upload.poll_deadline());

    Ok(UploadOrchestrator::new(
        credentials,
        selector,
        submitter,
        poller,
        UploadSettings {
            asset_type: upload.asset_type,
            max_retry: upload.max_retry,
            retry_backoff: upload.retry_backoff(),
        },
    ))
}

fn build_state(config: Config, service: Arc<dyn AssetService>, prometheus: PrometheusHandle) -> Result<AppState> {
    let orchestrator = build_orchestrator(&config, service)?;
    let owner = config.upload.creator()?;

    Ok(AppState {
        intake: IntakeState {
            orchestrator: Arc::new(orchestrator),
            intake: Arc::new(config.intake),
            owner,
        },
        prometheus,
        started_at: Instant::now(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting asset-upload-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.cloud.base_url,
        asset_type = %config.upload.asset_type,
        credentials = config.credentials.len(),
        max_retry = config.upload.max_retry,
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.cloud.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let service: Arc<dyn AssetService> = Arc::new(CloudClient::new(http, config.cloud.base_url.clone()));

    let listen_addr = config.server.listen_addr;
    let max_connections = config.server.max_connections;
    let app_state = build_state(config, service, prometheus_handle)?;
    let app = build_router(app_state, max_connections);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting uploads");

    // The drain timeout starts at signal receipt: stop accepting, then race
    // the in-flight batches against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn upload_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    intake::handle_upload(&state.intake, multipart, request_id).await
}

/// Health endpoint: uptime plus the cached quota of every credential.
/// Returns 503 once no credential has quota left.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let orchestrator = &state.intake.orchestrator;
    let mut body = orchestrator
        .cache()
        .health(orchestrator.credentials().as_slice())
        .await;

    let status_code = if body["status"] == "unhealthy" {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    } else {
        axum::http::StatusCode::OK
    };
    body["uptime_seconds"] = serde_json::json!(state.started_at.elapsed().as_secs());
    body["asset_type"] = serde_json::json!(orchestrator.settings().asset_type.as_str());

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint, text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
