use serde::Deserialize;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Parquet,
    Csv,
    Dat,
    Ndjson,
    Questdb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    /// File path for the file-backed kinds; ignored for `questdb`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestDbConfig {
    pub uri: String,
    pub max_connections: u32,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
    #[serde(default = "default_meters")]
    pub default_meters: Vec<i64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            default_meters: default_meters(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub questdb: Option<QuestDbConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8050".to_string()
}

fn default_window_days() -> i64 {
    14
}

fn default_meters() -> Vec<i64> {
    vec![1]
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
