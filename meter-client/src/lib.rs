pub mod db;
pub mod domain;
pub mod table;
pub mod timestamp;

pub use domain::Reading;
pub use table::ReadingTable;
