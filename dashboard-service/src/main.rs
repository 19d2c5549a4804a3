use anyhow::{Context, Result};
use dashboard_service::{
    config::AppConfig,
    metrics_server,
    observability,
    options::DashboardOptions,
    pipeline,
    server::{self, AppState},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr).await?;
    }

    // The table is loaded once; a bad dataset stops the process before serving.
    let dataset = pipeline::load_dataset(&cfg)
        .await
        .context("failed to load dataset")?;

    let options = DashboardOptions::from_table(&dataset.table, &cfg.dashboard);
    let state = Arc::new(AppState::new(dataset, options));

    server::run_server(state, &cfg.server.bind_addr).await
}
