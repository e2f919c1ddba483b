//! Sinks that persist fetched tables.
//!
//! - [`CsvFileSink`]: one delimited file per kind, class and stage
//! - [`SpreadsheetSink`]: one workbook sheet per kind, class and stage
//! - [`RacingNumberViewSink`]: the rows of the registered racing number only
//! - [`LatestTableSink`]: the newest table per resource key, kept in memory

mod csv_file;
mod latest;
mod racing_view;
mod sheet;

pub use csv_file::CsvFileSink;
pub use latest::LatestTableSink;
pub use racing_view::RacingNumberViewSink;
pub use sheet::{pad_rows, sheet_base, sheet_name, RegionWriter, SpreadsheetSink};
