use std::path::PathBuf;

use async_stream::try_stream;
use meter_client::Reading;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use super::coerce;
use crate::pipeline::{LoadError, ReadingStream, Source};

/// NDJSON source for `Reading`s.
///
/// Each non-blank line is a JSON object with `id`, `timestamp` and
/// `value_kwh`; `value_kwh` may be a number, a numeric string, or null.
pub struct NdjsonFileSource {
    path: PathBuf,
}

#[derive(serde::Deserialize)]
struct IncomingReading {
    id: i64,
    timestamp: String,
    #[serde(default)]
    value_kwh: serde_json::Value,
}

impl NdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn parse_line(line: &str, line_no: u64) -> Result<Reading, LoadError> {
    let incoming: IncomingReading =
        serde_json::from_str(line).map_err(|source| LoadError::Json { line: line_no, source })?;

    Ok(Reading {
        meter_id: incoming.id,
        timestamp: coerce::timestamp(line_no, &incoming.timestamp)?,
        value_kwh: coerce::kwh_json(line_no, &incoming.value_kwh)?,
    })
}

#[async_trait::async_trait]
impl Source for NdjsonFileSource {
    async fn stream(&self) -> ReadingStream {
        let path = self.path.clone();
        let s = try_stream! {
            let file = File::open(&path)
                .await
                .map_err(|source| LoadError::Io { path: path.clone(), source })?;
            let mut lines = BufReader::new(file).lines();
            let mut line_no: u64 = 0;

            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|source| LoadError::Io { path: path.clone(), source })?
            {
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                let reading = parse_line(&line, line_no)?;
                yield reading;
            }
        };

        Box::pin(s)
    }

    fn describe(&self) -> String {
        format!("ndjson file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::Write;
    use time::macros::datetime;

    #[test]
    fn parse_line_accepts_string_kwh() {
        let r = parse_line(r#"{"id": 4, "timestamp": "2023-01-01T00:15:00Z", "value_kwh": "0.125"}"#, 1).unwrap();
        assert_eq!(r.meter_id, 4);
        assert_eq!(r.timestamp, datetime!(2023-01-01 00:15 UTC));
        assert_eq!(r.value_kwh, 0.125);
    }

    #[test]
    fn parse_line_reports_line_number() {
        let err = parse_line(r#"{"id": 4, "timestamp": "2023-01-01", "value_kwh": "lots"}"#, 9).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { row: 9, column: "value_kwh", .. }));

        let err = parse_line("{not json", 2).unwrap_err();
        assert!(matches!(err, LoadError::Json { line: 2, .. }));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"id": 1, "timestamp": "2023-01-01 00:00:00", "value_kwh": 1.5}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"id": 2, "timestamp": "2023-01-01 00:15:00", "value_kwh": null}}"#).unwrap();

        let rows: Vec<Reading> = NdjsonFileSource::new(f.path()).stream().await.try_collect().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value_kwh, 1.5);
        assert!(rows[1].value_kwh.is_nan());
    }
}
