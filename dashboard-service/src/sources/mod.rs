pub mod coerce;
pub mod delimited_file;
pub mod ndjson_file;
pub mod parquet_file;
pub mod questdb;

pub use delimited_file::DelimitedFileSource;
pub use ndjson_file::NdjsonFileSource;
pub use parquet_file::ParquetFileSource;
pub use questdb::QuestDbSource;

use crate::{
    config::{AppConfig, DatasetKind},
    pipeline::{LoadError, ReadingStream, Source},
};

/// The configured dataset source.
pub enum DatasetSource {
    Parquet(ParquetFileSource),
    Delimited(DelimitedFileSource),
    Ndjson(NdjsonFileSource),
    QuestDb(QuestDbSource),
}

impl DatasetSource {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, LoadError> {
        let path = || {
            cfg.dataset
                .path
                .clone()
                .ok_or_else(|| LoadError::Config("dataset.path is required for file datasets".to_string()))
        };

        Ok(match cfg.dataset.kind {
            DatasetKind::Parquet => Self::Parquet(ParquetFileSource::new(path()?)),
            DatasetKind::Csv => Self::Delimited(DelimitedFileSource::csv(path()?)),
            DatasetKind::Dat => Self::Delimited(DelimitedFileSource::dat(path()?)),
            DatasetKind::Ndjson => Self::Ndjson(NdjsonFileSource::new(path()?)),
            DatasetKind::Questdb => {
                let qcfg = cfg.questdb.clone().ok_or_else(|| {
                    LoadError::Config("[questdb] section is required when dataset.kind = \"questdb\"".to_string())
                })?;
                Self::QuestDb(QuestDbSource::new(qcfg))
            }
        })
    }
}

#[async_trait::async_trait]
impl Source for DatasetSource {
    async fn stream(&self) -> ReadingStream {
        match self {
            Self::Parquet(s) => s.stream().await,
            Self::Delimited(s) => s.stream().await,
            Self::Ndjson(s) => s.stream().await,
            Self::QuestDb(s) => s.stream().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Parquet(s) => s.describe(),
            Self::Delimited(s) => s.describe(),
            Self::Ndjson(s) => s.describe(),
            Self::QuestDb(s) => s.describe(),
        }
    }
}
