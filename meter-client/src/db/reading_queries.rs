use anyhow::{bail, Result};
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::domain::Reading;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    timestamp: PrimitiveDateTime,
    value_kwh: f64,
}

impl From<ReadingRow> for Reading {
    fn from(r: ReadingRow) -> Self {
        Reading {
            meter_id: r.id,
            timestamp: r.timestamp.assume_utc(),
            value_kwh: r.value_kwh,
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fetch every reading of `table` in storage order.
///
/// `value_kwh` is cast to DOUBLE on the server, so a non-numeric value fails
/// the whole query rather than yielding a partial table.
pub async fn fetch_readings(pool: &PgPool, table: &str) -> Result<Vec<Reading>> {
    if !is_plain_identifier(table) {
        bail!("invalid table name '{table}'");
    }

    // Table names cannot be bound as parameters.
    let sql = format!(
        r#"
        SELECT
            CAST(id AS LONG)           AS id,
            "timestamp",
            CAST(value_kwh AS DOUBLE)  AS value_kwh
        FROM {table}
        "#
    );

    let rows = sqlx::query_as::<_, ReadingRow>(&sql).fetch_all(pool).await?;

    Ok(rows.into_iter().map(Reading::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn plain_identifiers_are_accepted() {
        assert!(is_plain_identifier("smart_meter_readings"));
        assert!(is_plain_identifier("readings2024"));
    }

    #[test]
    fn identifiers_with_sql_are_rejected() {
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("1readings"));
        assert!(!is_plain_identifier("readings; DROP TABLE x"));
        assert!(!is_plain_identifier("\"readings\""));
    }

    #[test]
    fn row_timestamp_is_taken_as_utc() {
        let row = ReadingRow {
            id: 7,
            timestamp: datetime!(2023-01-01 00:15:00),
            value_kwh: 0.25,
        };
        let reading: Reading = row.into();
        assert_eq!(reading.meter_id, 7);
        assert_eq!(reading.timestamp, datetime!(2023-01-01 00:15:00 UTC));
        assert_eq!(reading.value_kwh, 0.25);
    }
}
