//! Immutable in-memory reading table.
//!
//! Built once from a loaded dataset and only ever read afterwards, so it can be
//! shared behind an `Arc` without locking.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::Reading;

#[derive(Debug, Clone, Default)]
pub struct ReadingTable {
    // Rows grouped by meter, each group in source order.
    by_meter: BTreeMap<i64, Vec<Reading>>,
    len: usize,
    span: Option<(OffsetDateTime, OffsetDateTime)>,
}

impl ReadingTable {
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut by_meter: BTreeMap<i64, Vec<Reading>> = BTreeMap::new();
        let mut len = 0;
        let mut span: Option<(OffsetDateTime, OffsetDateTime)> = None;

        for r in readings {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(r.timestamp), hi.max(r.timestamp)),
                None => (r.timestamp, r.timestamp),
            });
            len += 1;
            by_meter.entry(r.meter_id).or_default().push(r);
        }

        Self { by_meter, len, span }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct meter ids present.
    pub fn meter_count(&self) -> usize {
        self.by_meter.len()
    }

    pub fn max_meter_id(&self) -> Option<i64> {
        self.by_meter.keys().next_back().copied()
    }

    /// Earliest and latest timestamp in the table.
    pub fn time_span(&self) -> Option<(OffsetDateTime, OffsetDateTime)> {
        self.span
    }

    /// Time-ordered load profile for a single meter.
    ///
    /// Both bounds are inclusive. Readings sharing a timestamp keep their
    /// source order. Unknown meters and empty or inverted ranges yield an
    /// empty profile.
    pub fn load_profile(
        &self,
        meter_id: i64,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Vec<&Reading> {
        let Some(rows) = self.by_meter.get(&meter_id) else {
            return Vec::new();
        };

        let mut profile: Vec<&Reading> = rows
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect();
        profile.sort_by_key(|r| r.timestamp);
        profile
    }
}
