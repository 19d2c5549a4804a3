use std::{fs::File, path::PathBuf};

use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, LargeStringArray, StringArray, TimestampNanosecondArray,
};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use meter_client::Reading;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use time::OffsetDateTime;

use super::coerce;
use crate::pipeline::{LoadError, ReadingStream, Source};

/// Parquet source for `Reading`s.
///
/// Columns `id` and `value_kwh` are cast to Int64 and Float64. Casts are
/// strict: a value that cannot be converted (e.g. the string "abc" in
/// `value_kwh`) fails the load instead of becoming null. Text timestamps go
/// through the same parser as the text formats; native temporal columns are
/// cast to Timestamp(ns).
pub struct ParquetFileSource {
    path: PathBuf,
}

impl ParquetFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a ArrayRef, LoadError> {
    batch.column_by_name(name).ok_or(LoadError::MissingColumn(name))
}

fn strict_cast(array: &ArrayRef, to: &DataType, column: &'static str) -> Result<ArrayRef, LoadError> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(array, to, &options).map_err(|source| LoadError::Coerce { column, source })
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &'static str) -> Result<&'a T, LoadError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| LoadError::Coerce {
        column,
        source: ArrowError::CastError(format!("unexpected array type {}", array.data_type())),
    })
}

fn text_timestamps<'a>(
    cells: impl Iterator<Item = Option<&'a str>>,
    first_row: u64,
) -> Result<Vec<Option<OffsetDateTime>>, LoadError> {
    cells
        .enumerate()
        .map(|(i, cell)| cell.map(|s| coerce::timestamp(first_row + i as u64, s)).transpose())
        .collect()
}

/// Timestamps of one batch, `None` where the cell is null.
fn timestamps(col: &ArrayRef, first_row: u64) -> Result<Vec<Option<OffsetDateTime>>, LoadError> {
    match col.data_type() {
        DataType::Utf8 => text_timestamps(downcast::<StringArray>(col, "timestamp")?.iter(), first_row),
        DataType::LargeUtf8 => text_timestamps(downcast::<LargeStringArray>(col, "timestamp")?.iter(), first_row),
        other => {
            // Keep any zone annotation: timestamp values are UTC epoch offsets either way.
            let ts_type = match other {
                DataType::Timestamp(_, tz) => DataType::Timestamp(TimeUnit::Nanosecond, tz.clone()),
                _ => DataType::Timestamp(TimeUnit::Nanosecond, None),
            };
            let ts = strict_cast(col, &ts_type, "timestamp")?;
            let ts: &TimestampNanosecondArray = downcast(&ts, "timestamp")?;

            ts.iter()
                .enumerate()
                .map(|(i, nanos)| {
                    nanos
                        .map(|nanos| {
                            OffsetDateTime::from_unix_timestamp_nanos(nanos as i128).map_err(|e| {
                                LoadError::InvalidValue {
                                    row: first_row + i as u64,
                                    column: "timestamp",
                                    value: nanos.to_string(),
                                    reason: e.to_string(),
                                }
                            })
                        })
                        .transpose()
                })
                .collect()
        }
    }
}

/// Convert one record batch. `first_row` is the 1-based row number of the
/// batch's first row within the file.
fn batch_to_readings(batch: &RecordBatch, first_row: u64) -> Result<Vec<Reading>, LoadError> {
    let ids = strict_cast(column(batch, "id")?, &DataType::Int64, "id")?;
    let ids: &Int64Array = downcast(&ids, "id")?;

    let ts = timestamps(column(batch, "timestamp")?, first_row)?;

    let kwh = strict_cast(column(batch, "value_kwh")?, &DataType::Float64, "value_kwh")?;
    let kwh: &Float64Array = downcast(&kwh, "value_kwh")?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for (i, timestamp) in ts.into_iter().enumerate() {
        let row = first_row + i as u64;

        if ids.is_null(i) {
            return Err(LoadError::InvalidValue {
                row,
                column: "id",
                value: "null".to_string(),
                reason: "meter id is required".to_string(),
            });
        }
        let Some(timestamp) = timestamp else {
            return Err(LoadError::InvalidValue {
                row,
                column: "timestamp",
                value: "null".to_string(),
                reason: "timestamp is required".to_string(),
            });
        };

        out.push(Reading {
            meter_id: ids.value(i),
            timestamp,
            value_kwh: if kwh.is_null(i) { f64::NAN } else { kwh.value(i) },
        });
    }

    Ok(out)
}

#[async_trait::async_trait]
impl Source for ParquetFileSource {
    async fn stream(&self) -> ReadingStream {
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path).map_err(|source| LoadError::Io { path: path.clone(), source })?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)
                .map_err(LoadError::from)?
                .build()
                .map_err(LoadError::from)?;

            let mut next_row: u64 = 1;
            for batch in reader {
                let batch = batch.map_err(LoadError::from)?;
                let readings = batch_to_readings(&batch, next_row)?;
                next_row += batch.num_rows() as u64;
                for reading in readings {
                    yield reading;
                }
            }
        };

        Box::pin(s)
    }

    fn describe(&self) -> String {
        format!("parquet file {}", self.path.display())
    }
}
