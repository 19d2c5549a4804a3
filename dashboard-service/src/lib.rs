pub mod chart;
pub mod config;
pub mod fingerprint;
pub mod metrics_server;
pub mod observability;
pub mod options;
pub mod pipeline;
pub mod server;
pub mod sources;
pub mod transform;

pub use pipeline::{Dataset, Pipeline};
