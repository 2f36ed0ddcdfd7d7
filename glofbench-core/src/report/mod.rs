//! Result table assembly and workbook output.

pub mod table;
pub mod xlsx;

pub use table::{HEADERS, MetricRecord, ResultTable, render_diagnostics};
pub use xlsx::{read_table, write_table};
