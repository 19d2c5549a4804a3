//! Selector options derived once from the loaded table.

use meter_client::ReadingTable;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    chart::{Addon, DateBound},
    config::DashboardConfig,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeterOption {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AddonOption {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatePicker {
    pub min_date_allowed: Option<String>,
    pub max_date_allowed: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOptions {
    pub meters: Vec<MeterOption>,
    pub addons: Vec<AddonOption>,
    pub date_picker: DatePicker,
    pub default_meters: Vec<i64>,
    #[serde(skip)]
    pub default_start: DateBound,
    #[serde(skip)]
    pub default_end: DateBound,
}

impl DashboardOptions {
    pub fn from_table(table: &ReadingTable, cfg: &DashboardConfig) -> Self {
        // Every id from 1 to the largest observed one, gaps included.
        let meters = (1..=table.max_meter_id().unwrap_or(0))
            .map(|id| MeterOption {
                label: id.to_string(),
                value: id,
            })
            .collect();

        let addons = Addon::ALL
            .iter()
            .map(|a| AddonOption {
                label: a.label(),
                value: a.value(),
            })
            .collect();

        let span = table.time_span();
        let first = span.map(|(lo, _)| lo).unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let default_start = DateBound::from_timestamp(first);
        // An unrepresentable window collapses to an empty one.
        let end = cfg
            .default_window_days
            .checked_mul(86_400)
            .map(Duration::seconds)
            .and_then(|window| first.checked_add(window))
            .unwrap_or(first);
        let default_end = DateBound::from_timestamp(end);

        let date_picker = DatePicker {
            min_date_allowed: span.map(|(lo, _)| DateBound::from_timestamp(lo).raw().to_string()),
            max_date_allowed: span.map(|(_, hi)| DateBound::from_timestamp(hi).raw().to_string()),
            start_date: default_start.raw().to_string(),
            end_date: default_end.raw().to_string(),
        };

        Self {
            meters,
            addons,
            date_picker,
            default_meters: cfg.default_meters.clone(),
            default_start,
            default_end,
        }
    }
}
