pub mod reading_queries;

pub use reading_queries::fetch_readings;
