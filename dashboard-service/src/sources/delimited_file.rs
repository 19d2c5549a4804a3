use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use meter_client::Reading;

use super::coerce;
use crate::pipeline::{LoadError, ReadingStream, Source};

/// Delimited text source for `Reading`s: comma-separated (`.csv`) or
/// pipe-delimited (`.dat`).
///
/// Expected header columns (by name, any order, extra columns ignored):
/// - id
/// - timestamp
/// - value_kwh
pub struct DelimitedFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl DelimitedFileSource {
    pub fn csv<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn dat<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b'|',
        }
    }
}

struct Columns {
    id: usize,
    timestamp: usize,
    value_kwh: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(LoadError::MissingColumn(name))
        };

        Ok(Self {
            id: find("id")?,
            timestamp: find("timestamp")?,
            value_kwh: find("value_kwh")?,
        })
    }
}

fn record_to_reading(record: &StringRecord, cols: &Columns, row: u64) -> Result<Reading, LoadError> {
    let cell = |idx: usize| record.get(idx).unwrap_or("");

    Ok(Reading {
        meter_id: coerce::meter_id(row, cell(cols.id))?,
        timestamp: coerce::timestamp(row, cell(cols.timestamp))?,
        value_kwh: coerce::kwh(row, cell(cols.value_kwh))?,
    })
}

#[async_trait::async_trait]
impl Source for DelimitedFileSource {
    async fn stream(&self) -> ReadingStream {
        // Blocking reader inside a single async task; the load runs once at startup.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::try_stream! {
            let file = File::open(&path).map_err(|source| LoadError::Io { path: path.clone(), source })?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(file);
            let headers = rdr.headers().map_err(LoadError::from)?.clone();
            let cols = Columns::from_headers(&headers)?;

            for result in rdr.records() {
                let record = result.map_err(LoadError::from)?;
                let row = record.position().map(|p| p.line()).unwrap_or_default();
                let reading = record_to_reading(&record, &cols, row)?;
                yield reading;
            }
        };

        Box::pin(s)
    }

    fn describe(&self) -> String {
        format!("delimited file {} (delimiter '{}')", self.path.display(), self.delimiter as char)
    }
}
