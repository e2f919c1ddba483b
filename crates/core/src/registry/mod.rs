//! Shared per-class registry: racing number and active stage.
//!
//! The registry is maintained by hand in the workbook and read back on
//! demand. Every refresh replaces the whole map at once.

mod store;

pub use store::{normalize_cell, RegistryEntry, RegistryStore};

use thiserror::Error;

use crate::workbook::WorkbookError;

/// Why a registry range could not be read.
#[derive(Debug, Error)]
pub enum RegistryRefreshError {
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("range {range} has {rows} rows, need 3 (classes, racing numbers, stages)")]
    TooFewRows { range: String, rows: usize },
}
