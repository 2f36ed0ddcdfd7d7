//! Data loading: delimited sources, the numeric dataset type and synthetic records.

pub mod dataset;
pub mod source;
pub mod synthetic;

pub use dataset::Dataset;
pub use source::{CsvSource, DataSource, RecordTable};
