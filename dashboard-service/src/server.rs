//! HTTP dashboard.
//!
//! - `GET /`             dashboard page (selector form and chart)
//! - `GET /api/options`  selector options
//! - `GET /api/chart`    plotly figure JSON
//! - `GET /chart.html`   standalone chart page
//! - `GET /healthz`      liveness and dataset summary

use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use meter_client::{timestamp::ParseTimestampError, ReadingTable};
use serde::{Deserialize, Serialize};

use crate::{
    chart::{self, render, Addon, Chart, ChartRequest, DateBound},
    options::DashboardOptions,
    pipeline::Dataset,
};

/// Shared, read-only state. The table is never mutated after load.
pub struct AppState {
    pub table: Arc<ReadingTable>,
    pub fingerprint: String,
    pub options: DashboardOptions,
}

impl AppState {
    pub fn new(dataset: Dataset, options: DashboardOptions) -> Self {
        Self {
            table: Arc::new(dataset.table),
            fingerprint: dataset.fingerprint,
            options,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("invalid meter id '{0}'")]
    InvalidMeterId(String),
    #[error("invalid {field}: {source}")]
    InvalidDate {
        field: &'static str,
        #[source]
        source: ParseTimestampError,
    },
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        metrics::counter!("chart_request_rejected_total").increment(1);
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Query parameters shared by the chart routes. Lists are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub meters: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub addons: Option<String>,
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

pub fn parse_meters(s: &str) -> Result<Vec<i64>, RequestError> {
    split_list(s)
        .map(|p| p.parse().map_err(|_| RequestError::InvalidMeterId(p.to_string())))
        .collect()
}

pub fn parse_addons(s: &str) -> Vec<Addon> {
    split_list(s)
        .filter_map(|p| {
            let addon = Addon::from_value(p);
            if addon.is_none() {
                tracing::debug!(addon = p, "ignoring unknown addon");
            }
            addon
        })
        .collect()
}

fn parse_bound(field: &'static str, raw: Option<String>, default: &DateBound) -> Result<DateBound, RequestError> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(s) => DateBound::parse(s).map_err(|source| RequestError::InvalidDate { field, source }),
        None => Ok(default.clone()),
    }
}

impl ChartQuery {
    /// Resolve against the dashboard defaults. Absent meters fall back to
    /// `default_meters`; absent dates to the date-picker defaults.
    pub fn into_request(
        self,
        options: &DashboardOptions,
        default_meters: &[i64],
    ) -> Result<ChartRequest, RequestError> {
        let selected_meters = match self.meters {
            Some(s) => parse_meters(&s)?,
            None => default_meters.to_vec(),
        };

        Ok(ChartRequest {
            selected_meters,
            start: parse_bound("start_date", self.start_date, &options.default_start)?,
            end: parse_bound("end_date", self.end_date, &options.default_end)?,
            addons: self.addons.as_deref().map(parse_addons).unwrap_or_default(),
        })
    }
}

fn timed_build(state: &AppState, request: &ChartRequest, route: &'static str) -> Chart {
    let started = Instant::now();
    let chart = chart::build_chart(&state.table, request);
    let elapsed = started.elapsed();

    metrics::counter!("chart_requests_total", "route" => route).increment(1);
    metrics::histogram!("chart_build_seconds").record(elapsed.as_secs_f64());
    tracing::debug!(
        route,
        meters = ?request.selected_meters,
        start = request.start.raw(),
        end = request.end.raw(),
        points = chart.series.iter().map(|s| s.points.len()).sum::<usize>(),
        "chart built"
    );

    chart
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/options", get(options_handler))
        .route("/api/chart", get(chart_handler))
        .route("/chart.html", get(chart_html_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

/// Serve the dashboard until the process exits.
pub async fn run_server(state: Arc<AppState>, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid server.bind_addr '{bind_addr}'"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard listener on {addr}"))?;
    tracing::info!(%addr, "dashboard listening");

    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn options_handler(State(state): State<Arc<AppState>>) -> Json<DashboardOptions> {
    Json(state.options.clone())
}

async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, RequestError> {
    let request = query.into_request(&state.options, &[])?;
    let chart = timed_build(&state, &request, "api");
    Ok(([(header::CONTENT_TYPE, "application/json")], render::to_json(&chart)).into_response())
}

async fn chart_html_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Html<String>, RequestError> {
    let request = query.into_request(&state.options, &[])?;
    let chart = timed_build(&state, &request, "html");
    Ok(Html(render::to_html(&chart)))
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Html<String>, RequestError> {
    let request = query.into_request(&state.options, &state.options.default_meters)?;
    let chart = timed_build(&state, &request, "index");
    Ok(Html(index_page(&state.options, &request, &chart)))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    rows: usize,
    meters: usize,
    fingerprint: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rows: state.table.len(),
        meters: state.table.meter_count(),
        fingerprint: state.fingerprint.clone(),
    })
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

fn index_page(options: &DashboardOptions, request: &ChartRequest, chart: &Chart) -> String {
    let meters = request
        .selected_meters
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let max_meter = options.meters.last().map(|m| m.value).unwrap_or(0);
    let min_date = options.date_picker.min_date_allowed.as_deref().unwrap_or("");
    let max_date = options.date_picker.max_date_allowed.as_deref().unwrap_or("");
    let addon_boxes: String = options
        .addons
        .iter()
        .map(|a| {
            let checked = Addon::from_value(a.value).is_some_and(|x| request.addons.contains(&x));
            format!(
                r#"<label><input type="checkbox" name="addons" value="{}"{}> {}</label>"#,
                a.value,
                if checked { " checked" } else { "" },
                escape_html(a.label)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>A look at smart meters</title>
<script src="{PLOTLY_JS}"></script>
</head>
<body>
<h1>A look at smart meters</h1>
<h2>Select a smart meters:</h2>
<form method="get" action="/">
<label>Date range:
<input type="date" name="start_date" value="{start}" min="{min}" max="{max}">
<input type="date" name="end_date" value="{end}" min="{min}" max="{max}">
</label>
<label>Meter IDs (1-{max_meter}): <input type="text" name="meters" value="{meters}"></label>
<span>Addons: {addon_boxes}</span>
<button type="submit">Update</button>
</form>
{plot}
</body>
</html>
"#,
        start = escape_html(&request.start.date_prefix()),
        end = escape_html(&request.end.date_prefix()),
        min = escape_html(min_date.get(..10).unwrap_or(min_date)),
        max = escape_html(max_date.get(..10).unwrap_or(max_date)),
        meters = escape_html(&meters),
        plot = render::to_inline_html(chart, "meter-graph"),
    )
}
