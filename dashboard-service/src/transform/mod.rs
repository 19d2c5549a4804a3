use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::{LoadError, Transform};
use meter_client::Reading;
use time::macros::datetime;

/// Number of individual warnings logged at WARN before dropping to DEBUG.
const WARN_LOG_LIMIT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityWarning {
    NegativeKwh,
    NonFiniteKwh,
    TimestampOutOfRange,
}

impl SanityWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NegativeKwh => "kwh is negative",
            Self::NonFiniteKwh => "kwh is not finite",
            Self::TimestampOutOfRange => "timestamp outside [2000-01-01, 2100-01-01]",
        }
    }
}

/// Pure sanity check of a loaded `Reading`.
///
/// Rules:
/// - kWh should be finite and non-negative.
/// - timestamp should be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn check_reading(r: &Reading) -> Option<SanityWarning> {
    if !r.value_kwh.is_finite() {
        return Some(SanityWarning::NonFiniteKwh);
    }
    if r.value_kwh < 0.0 {
        return Some(SanityWarning::NegativeKwh);
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.timestamp < min_ts || r.timestamp > max_ts {
        return Some(SanityWarning::TimestampOutOfRange);
    }

    None
}

/// Non-fatal load check: suspicious readings are logged and counted, then
/// kept as-is.
#[derive(Default)]
pub struct SanityCheck {
    seen: AtomicU64,
}

impl SanityCheck {
    pub fn warnings(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

impl Transform for SanityCheck {
    fn apply(&self, input: Reading) -> Result<Reading, LoadError> {
        if let Some(w) = check_reading(&input) {
            metrics::counter!("dataset_load_warnings_total", "check" => w.as_str()).increment(1);
            let n = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
            if n <= WARN_LOG_LIMIT {
                tracing::warn!(
                    meter_id = input.meter_id,
                    timestamp = %input.timestamp,
                    value_kwh = input.value_kwh,
                    "suspicious reading: {}",
                    w.as_str()
                );
            } else {
                tracing::debug!(meter_id = input.meter_id, "suspicious reading: {}", w.as_str());
            }
        }
        Ok(input)
    }
}
