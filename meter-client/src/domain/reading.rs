use time::OffsetDateTime;

/// One energy measurement for one meter and sampling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub meter_id: i64,
    pub timestamp: OffsetDateTime,
    pub value_kwh: f64,
}
