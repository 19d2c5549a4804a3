use std::net::SocketAddr;

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
///
/// Must be called at most once per process, before any metric is emitted.
pub async fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid metrics bind address '{bind_addr}'"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;
    describe_metrics();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;

    tokio::spawn(async move {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(handle);

        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "metrics server error");
        }
    });

    tracing::info!(%addr, "metrics endpoint listening");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("dataset_rows_loaded_total", "Readings loaded into the table at startup");
    metrics::describe_counter!(
        "dataset_load_warnings_total",
        "Loaded readings that failed a non-fatal sanity check"
    );
    metrics::describe_histogram!("dataset_load_seconds", "Wall time spent loading the dataset");
    metrics::describe_counter!("chart_requests_total", "Chart requests served");
    metrics::describe_counter!(
        "chart_request_rejected_total",
        "Chart requests rejected for malformed query parameters"
    );
    metrics::describe_histogram!("chart_build_seconds", "Time spent building one chart");
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
