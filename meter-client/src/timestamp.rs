//! Lenient UTC timestamp parsing shared by the dataset loaders and the chart
//! date bounds.
//!
//! Accepted forms, interpreted as UTC when they carry no offset:
//! - RFC 3339 (`2023-01-01T00:15:00Z`, `2023-01-01T00:15:00+01:00`)
//! - `YYYY-MM-DD[T ]HH:MM:SS[.fraction]`
//! - `YYYY-MM-DD[T ]HH:MM`
//! - `YYYY-MM-DD` (midnight)

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized timestamp '{0}'")]
pub struct ParseTimestampError(pub String);

pub fn parse_utc(input: &str) -> Result<OffsetDateTime, ParseTimestampError> {
    let s = input.trim();

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts);
    }

    let naive = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            s,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
    })
    .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")))
    .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")))
    .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]")))
    .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day] [hour]:[minute]")));

    if let Ok(ts) = naive {
        return Ok(ts.assume_utc());
    }

    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| ParseTimestampError(input.to_string()))
}
