//! Bankruptcy Prediction Serving Service - Main Entry Point
//!
//! Loads the trained artifact bundle once at startup, registers the
//! in-process scoring backend, and serves predictions over HTTP.

use anyhow::{Context, Result};
use bankruptcy_predictor::{
    config::AppConfig,
    dispatcher::{self, AppState, EndpointRegistry, LocalBackend},
    metrics::{MetricsReporter, ServingMetrics},
    ArtifactBundle,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Bankruptcy Prediction Serving Service");
    info!("Configuration loaded successfully");

    // Initialize metrics
    let metrics = Arc::new(ServingMetrics::new());

    // Load the artifact bundle (cold start; fatal on failure)
    let bundle = Arc::new(
        ArtifactBundle::load(&config.artifacts).context("Failed to load artifact bundle")?,
    );
    info!(
        model_type = %bundle.model_type(),
        features = bundle.feature_count(),
        "Artifact bundle ready"
    );

    // Register the in-process scoring backend
    let registry = Arc::new(EndpointRegistry::new());
    let endpoint_name = config
        .endpoint
        .name
        .clone()
        .unwrap_or_else(|| format!("{}-local", config.endpoint.marker));
    registry.register(
        &endpoint_name,
        Arc::new(LocalBackend::new(bundle.clone(), metrics.clone())),
    );

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Build router and serve
    let state = AppState {
        registry,
        endpoint_config: config.endpoint.clone(),
        model_type: config.artifacts.model_type.clone(),
        metrics,
    };
    let app = dispatcher::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
