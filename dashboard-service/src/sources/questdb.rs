use meter_client::db::fetch_readings;
use sqlx::postgres::PgPoolOptions;

use crate::config::QuestDbConfig;
use crate::pipeline::{LoadError, ReadingStream, Source};

/// Reads the whole reading table from QuestDB over pgwire.
///
/// The pool lives only for the duration of the load.
pub struct QuestDbSource {
    cfg: QuestDbConfig,
}

impl QuestDbSource {
    pub fn new(cfg: QuestDbConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait::async_trait]
impl Source for QuestDbSource {
    async fn stream(&self) -> ReadingStream {
        let cfg = self.cfg.clone();
        let s = async_stream::try_stream! {
            let pool = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .connect(&cfg.uri)
                .await
                .map_err(|e| LoadError::Database(format!("failed to connect to QuestDB: {e}")))?;

            let rows = fetch_readings(&pool, &cfg.table)
                .await
                .map_err(|e| LoadError::Database(format!("{e:#}")))?;
            pool.close().await;

            for reading in rows {
                yield reading;
            }
        };

        Box::pin(s)
    }

    fn describe(&self) -> String {
        format!("questdb table {}", self.cfg.table)
    }
}
