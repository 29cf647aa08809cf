// Main entry point - Dependency injection and server setup
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use epi_dashboard::application::chart_service::ChartService;
use epi_dashboard::application::custom_graph_service::CustomGraphService;
use epi_dashboard::infrastructure::config::load_dashboard_config;
use epi_dashboard::infrastructure::file_repository::FileSourceRepository;
use epi_dashboard::presentation::app_state::AppState;
use epi_dashboard::presentation::handlers::{
    custom_graph, get_chart, health_check, list_charts, set_visibility, stream_charts,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Arc::new(load_dashboard_config().context("Failed to load config/dashboard")?);

    // Create repository (infrastructure layer)
    let repository = Arc::new(FileSourceRepository::new(&config.data));

    // Create services (application layer)
    let chart_service = ChartService::new(repository, config.clone());
    let custom_graph_service = CustomGraphService::new(chart_service.clone(), config.render.interpolation.into());

    // Create application state
    let state = Arc::new(AppState {
        chart_service,
        custom_graph_service,
    });

    // Build router (presentation layer)
    // Compression is applied by the response builders, so no CompressionLayer here
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/charts", get(list_charts))
        .route("/charts/stream", get(stream_charts))
        .route("/charts/:id", get(get_chart))
        .route("/charts/:id/visibility", post(set_visibility))
        .route("/custom-graph", post(custom_graph))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.server.bind_address.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    tracing::info!(
        "Starting epi-dashboard on {} with {} charts",
        config.server.bind_address,
        config.charts.len()
    );

    axum::serve(listener, router).await?;

    Ok(())
}
