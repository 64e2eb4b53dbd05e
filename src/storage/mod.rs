//! Storage layer: block files, their page format and CSV sources.

mod csv_source;
mod disk_manager;
pub mod page;

pub use csv_source::{parse_row, CsvSource};
pub use disk_manager::DiskManager;
