//! Chart building: the query over the reading table and the chart description
//! handed to the renderer.

pub mod render;

use meter_client::{
    timestamp::{parse_utc, ParseTimestampError},
    ReadingTable,
};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};

pub const X_AXIS_TITLE: &str = "Time";
pub const Y_AXIS_TITLE: &str = "Energy consumption (kWh)";

/// Optional display modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Addon {
    /// Accepted and echoed in the options, but not drawn.
    #[serde(rename = "avg-line")]
    AvgLine,
}

impl Addon {
    pub const ALL: [Addon; 1] = [Addon::AvgLine];

    pub fn value(&self) -> &'static str {
        match self {
            Self::AvgLine => "avg-line",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AvgLine => "Display Avg Line",
        }
    }

    pub fn from_value(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.value() == s)
    }
}

/// A date bound as the user supplied it, together with its parsed instant.
///
/// The raw text is kept because the chart title quotes it.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBound {
    raw: String,
    at: OffsetDateTime,
}

impl DateBound {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ParseTimestampError> {
        let raw = raw.into();
        let at = parse_utc(&raw)?;
        Ok(Self { raw, at })
    }

    /// Bound for a known instant, rendered as `YYYY-MM-DDTHH:MM:SS`.
    pub fn from_timestamp(at: OffsetDateTime) -> Self {
        let raw = at
            .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| at.to_string());
        Self { raw, at }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn at(&self) -> OffsetDateTime {
        self.at
    }

    /// First ten characters of the raw text (the calendar date for ISO input).
    pub fn date_prefix(&self) -> String {
        self.raw.chars().take(10).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub selected_meters: Vec<i64>,
    pub start: DateBound,
    pub end: DateBound,
    pub addons: Vec<Addon>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub meter_id: i64,
    pub points: Vec<(OffsetDateTime, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_axis_title: &'static str,
    pub y_axis_title: &'static str,
    pub series: Vec<LineSeries>,
}

/// Build one line series per requested meter, in request order.
///
/// Series are labelled by their position in the request ("Meter 1" is the
/// first requested meter, whatever its id). Unknown ids and empty ranges give
/// empty series; this never fails.
pub fn build_chart(table: &ReadingTable, request: &ChartRequest) -> Chart {
    if request.addons.contains(&Addon::AvgLine) {
        tracing::debug!("avg-line addon requested; it has no rendering");
    }

    let series = request
        .selected_meters
        .iter()
        .enumerate()
        .map(|(i, &meter_id)| LineSeries {
            name: format!("Meter {}", i + 1),
            meter_id,
            points: table
                .load_profile(meter_id, request.start.at(), request.end.at())
                .into_iter()
                .map(|r| (r.timestamp, r.value_kwh))
                .collect(),
        })
        .collect();

    Chart {
        title: format!(
            "Energy consumption for selected meters from {} to {}",
            request.start.date_prefix(),
            request.end.date_prefix()
        ),
        x_axis_title: X_AXIS_TITLE,
        y_axis_title: Y_AXIS_TITLE,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::Reading;
    use proptest::prelude::*;
    use time::macros::datetime;
    use time::Duration;

    const T1: OffsetDateTime = datetime!(2023-01-01 00:00 UTC);
    const T2: OffsetDateTime = datetime!(2023-01-01 00:15 UTC);
    const T3: OffsetDateTime = datetime!(2023-01-01 00:30 UTC);

    fn table() -> ReadingTable {
        ReadingTable::from_readings(vec![
            Reading { meter_id: 1, timestamp: T3, value_kwh: 3.0 },
            Reading { meter_id: 1, timestamp: T1, value_kwh: 1.0 },
            Reading { meter_id: 2, timestamp: T1, value_kwh: 7.0 },
            Reading { meter_id: 1, timestamp: T2, value_kwh: 2.0 },
        ])
    }

    fn request(meters: Vec<i64>, start: OffsetDateTime, end: OffsetDateTime) -> ChartRequest {
        ChartRequest {
            selected_meters: meters,
            start: DateBound::from_timestamp(start),
            end: DateBound::from_timestamp(end),
            addons: vec![],
        }
    }

    #[test]
    fn single_meter_range_is_inclusive() {
        let chart = build_chart(&table(), &request(vec![1], T1, T2));
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "Meter 1");
        assert_eq!(chart.series[0].points, vec![(T1, 1.0), (T2, 2.0)]);
    }

    #[test]
    fn no_meters_gives_no_series() {
        let chart = build_chart(&table(), &request(vec![], T1, T3));
        assert!(chart.series.is_empty());
        assert_eq!(chart.x_axis_title, "Time");
        assert_eq!(chart.y_axis_title, "Energy consumption (kWh)");
    }

    #[test]
    fn unknown_meter_gives_empty_series_labelled_by_position() {
        let chart = build_chart(&table(), &request(vec![5], T1, T3));
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "Meter 1");
        assert_eq!(chart.series[0].meter_id, 5);
        assert!(chart.series[0].points.is_empty());
    }

    #[test]
    fn duplicate_meters_give_duplicate_series() {
        let chart = build_chart(&table(), &request(vec![1, 1], T1, T3));
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Meter 1", "Meter 2"]);
        assert_eq!(chart.series[0].points, chart.series[1].points);
        assert_eq!(chart.series[0].points.len(), 3);
    }

    #[test]
    fn labels_follow_position_not_id() {
        let chart = build_chart(&table(), &request(vec![2, 1], T1, T3));
        assert_eq!(chart.series[0].name, "Meter 1");
        assert_eq!(chart.series[0].meter_id, 2);
        assert_eq!(chart.series[0].points, vec![(T1, 7.0)]);
        assert_eq!(chart.series[1].name, "Meter 2");
        assert_eq!(chart.series[1].meter_id, 1);
    }

    #[test]
    fn title_quotes_first_ten_characters() {
        let req = ChartRequest {
            selected_meters: vec![1],
            start: DateBound::parse("2023-01-01T00:00:00").unwrap(),
            end: DateBound::parse("2023-01-15").unwrap(),
            addons: vec![Addon::AvgLine],
        };
        let chart = build_chart(&table(), &req);
        assert_eq!(
            chart.title,
            "Energy consumption for selected meters from 2023-01-01 to 2023-01-15"
        );
    }

    #[test]
    fn date_only_end_bound_is_midnight() {
        let req = ChartRequest {
            selected_meters: vec![1],
            start: DateBound::parse("2023-01-01").unwrap(),
            end: DateBound::parse("2023-01-01").unwrap(),
            addons: vec![],
        };
        let chart = build_chart(&table(), &req);
        assert_eq!(chart.series[0].points, vec![(T1, 1.0)]);
    }

    #[test]
    fn avg_line_addon_has_no_effect() {
        let plain = request(vec![1, 2], T1, T3);
        let mut with_addon = plain.clone();
        with_addon.addons = vec![Addon::AvgLine];
        assert_eq!(build_chart(&table(), &plain), build_chart(&table(), &with_addon));
    }

    #[test]
    fn addon_values_round_trip() {
        assert_eq!(Addon::from_value("avg-line"), Some(Addon::AvgLine));
        assert_eq!(Addon::from_value("trend"), None);
        assert_eq!(Addon::AvgLine.label(), "Display Avg Line");
    }

    #[test]
    fn short_raw_bound_prefix_is_whole_string() {
        let b = DateBound {
            raw: "2023".to_string(),
            at: T1,
        };
        assert_eq!(b.date_prefix(), "2023");
    }

    fn arb_table() -> impl Strategy<Value = ReadingTable> {
        prop::collection::vec((1i64..5, 0i64..300, 0.0f64..5.0), 0..150).prop_map(|rows| {
            ReadingTable::from_readings(rows.into_iter().map(|(id, m, kwh)| Reading {
                meter_id: id,
                timestamp: T1 + Duration::minutes(m),
                value_kwh: kwh,
            }))
        })
    }

    proptest! {
        #[test]
        fn chart_properties_hold(
            table in arb_table(),
            meters in prop::collection::vec(-2i64..8, 0..6),
            a in 0i64..300,
            b in 0i64..300,
        ) {
            let req = request(meters.clone(), T1 + Duration::minutes(a), T1 + Duration::minutes(b));
            let chart = build_chart(&table, &req);

            prop_assert_eq!(chart.series.len(), meters.len());
            for (i, s) in chart.series.iter().enumerate() {
                prop_assert_eq!(&s.name, &format!("Meter {}", i + 1));
                prop_assert_eq!(s.meter_id, meters[i]);
                if table.load_profile(s.meter_id, T1, T1 + Duration::days(1)).is_empty() {
                    prop_assert!(s.points.is_empty());
                }
                for (ts, _) in &s.points {
                    prop_assert!(req.start.at() <= *ts && *ts <= req.end.at());
                }
                for w in s.points.windows(2) {
                    prop_assert!(w[0].0 <= w[1].0);
                }
            }

            prop_assert_eq!(build_chart(&table, &req), chart);
        }
    }
}
