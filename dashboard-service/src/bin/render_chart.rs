use anyhow::{bail, Context, Result};
use dashboard_service::{
    chart::{self, render},
    config::AppConfig,
    observability,
    options::DashboardOptions,
    pipeline,
    server::ChartQuery,
};
use std::env;

/// Render one chart to a standalone HTML file without starting the server.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: render_chart <output.html> [meters] [start_date] [end_date]");
    }
    let output = &args[1];

    // Uses the same DASHBOARD_CONFIG file as the server.
    let cfg = AppConfig::load()?;
    let dataset = pipeline::load_dataset(&cfg)
        .await
        .context("failed to load dataset")?;
    let options = DashboardOptions::from_table(&dataset.table, &cfg.dashboard);

    let query = ChartQuery {
        meters: args.get(2).cloned(),
        start_date: args.get(3).cloned(),
        end_date: args.get(4).cloned(),
        addons: None,
    };
    let request = query.into_request(&options, &cfg.dashboard.default_meters)?;
    let chart = chart::build_chart(&dataset.table, &request);

    std::fs::write(output, render::to_html(&chart)).with_context(|| format!("failed to write {output}"))?;
    tracing::info!(output = %output, series = chart.series.len(), title = %chart.title, "chart written");

    Ok(())
}
