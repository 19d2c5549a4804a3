use plotly::{common::Mode, layout::Axis, Layout, Plot, Scatter};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::Chart;

fn x_value(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

/// Convert a chart description into a plotly figure: one line trace per series.
pub fn to_plot(chart: &Chart) -> Plot {
    let mut plot = Plot::new();

    for series in &chart.series {
        let (x, y): (Vec<String>, Vec<f64>) = series
            .points
            .iter()
            .map(|&(ts, kwh)| (x_value(ts), kwh))
            .unzip();

        let trace = Scatter::new(x, y).mode(Mode::Lines).name(series.name.as_str());
        plot.add_trace(trace);
    }

    let layout = Layout::new()
        .title(chart.title.as_str())
        .x_axis(Axis::new().title(chart.x_axis_title))
        .y_axis(Axis::new().title(chart.y_axis_title));
    plot.set_layout(layout);

    plot
}

/// Plotly figure JSON (`data` and `layout`).
pub fn to_json(chart: &Chart) -> String {
    to_plot(chart).to_json()
}

/// Standalone HTML page rendering the chart.
pub fn to_html(chart: &Chart) -> String {
    to_plot(chart).to_html()
}

/// HTML fragment rendering the chart into a `<div>` with id `div_id`.
///
/// The host page must load plotly.js.
pub fn to_inline_html(chart: &Chart, div_id: &str) -> String {
    to_plot(chart).to_inline_html(Some(div_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{LineSeries, X_AXIS_TITLE, Y_AXIS_TITLE};
    use time::macros::datetime;

    fn chart() -> Chart {
        Chart {
            title: "Energy consumption for selected meters from 2023-01-01 to 2023-01-15".to_string(),
            x_axis_title: X_AXIS_TITLE,
            y_axis_title: Y_AXIS_TITLE,
            series: vec![
                LineSeries {
                    name: "Meter 1".to_string(),
                    meter_id: 4,
                    points: vec![
                        (datetime!(2023-01-01 00:00 UTC), 1.0),
                        (datetime!(2023-01-01 00:15 UTC), 2.5),
                    ],
                },
                LineSeries {
                    name: "Meter 2".to_string(),
                    meter_id: 9,
                    points: vec![],
                },
            ],
        }
    }

    #[test]
    fn figure_has_one_line_trace_per_series() {
        let fig: serde_json::Value = serde_json::from_str(&to_json(&chart())).unwrap();
        let data = fig["data"].as_array().unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["name"], "Meter 1");
        assert_eq!(data[0]["mode"], "lines");
        assert_eq!(data[0]["x"][1], "2023-01-01T00:15:00Z");
        assert_eq!(data[0]["y"][1], 2.5);
        assert_eq!(data[1]["name"], "Meter 2");
        assert_eq!(data[1]["x"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn figure_carries_titles() {
        let json = to_json(&chart());
        assert!(json.contains("Energy consumption for selected meters from 2023-01-01 to 2023-01-15"));
        assert!(json.contains("\"Time\""));
        assert!(json.contains("Energy consumption (kWh)"));
    }

    #[test]
    fn inline_html_targets_div() {
        let html = to_inline_html(&chart(), "meter-graph");
        assert!(html.contains("meter-graph"));
    }
}
