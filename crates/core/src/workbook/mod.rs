//! Shared spreadsheet workbook boundary.
//!
//! The exporters and the registry talk to the workbook only through the
//! blocking [`Workbook`] trait. Async callers run workbook calls on the
//! blocking pool.
//!
//! Backends:
//! - [`MemoryWorkbook`]: in-process sparse grid
//! - [`CsvDirWorkbook`]: a directory with one CSV file per sheet

mod csv_dir;
mod memory;
mod range;

pub use csv_dir::CsvDirWorkbook;
pub use memory::MemoryWorkbook;
pub use range::{column_index, column_letter, CellRange, CellRef};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised by workbook backends.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("invalid cell reference: {0}")]
    InvalidRange(String),

    #[error("workbook lock poisoned")]
    LockPoisoned,

    #[error("failed to persist sheet '{sheet}': {message}")]
    Persist { sheet: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A workbook that can be read and written by rectangular ranges.
///
/// Implementations must make each call atomic with respect to other calls
/// on the same workbook.
pub trait Workbook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Create the sheet if it does not exist yet.
    fn ensure_sheet(&self, sheet: &str) -> Result<(), WorkbookError>;

    /// Read a range as dense rows; missing cells read as empty strings.
    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>, WorkbookError>;

    /// Write `values` with their top-left cell at `anchor` in one operation.
    /// Creates the sheet if needed. Empty strings clear their cell.
    fn write_range(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
    ) -> Result<(), WorkbookError>;

    /// Clear every cell inside `range`. Clearing on a missing sheet is a no-op.
    fn clear_range(&self, sheet: &str, range: &CellRange) -> Result<(), WorkbookError>;

    /// Write `values` at `anchor` and clear every range in `clear`, as one
    /// operation: no reader sees the new values next to stale cells.
    /// Creates the sheet if needed.
    fn write_region(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
        clear: &[CellRange],
    ) -> Result<(), WorkbookError>;

    /// Names of all sheets.
    fn sheet_names(&self) -> Result<Vec<String>, WorkbookError>;
}

/// Longest sheet name spreadsheet applications accept.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: [char; 7] = ['\\', '/', '?', '*', '[', ']', ':'];

/// Make a string usable as a sheet name: at most 31 characters, no
/// `\ / ? * [ ] :`, never empty.
pub fn clean_sheet_name(name: &str) -> String {
    fit_sheet_name(name, "")
}

/// Sheet name for `base` followed by `suffix`, kept within 31 characters.
///
/// A base that is already usable is kept verbatim. Otherwise forbidden
/// characters become `_`, the base is shortened to make room, and
/// `~<hash>` of the original base is inserted before the suffix, so two
/// different bases never end up with the same name. The suffix always
/// survives.
pub fn fit_sheet_name(base: &str, suffix: &str) -> String {
    if base.trim().is_empty() {
        return format!("Sheet{}", suffix);
    }

    let suffix_len = suffix.chars().count();
    let usable = !base.contains(FORBIDDEN_SHEET_CHARS)
        && base.chars().count() + suffix_len <= MAX_SHEET_NAME_LEN;
    if usable {
        return format!("{}{}", base, suffix);
    }

    let digest = format!("{:x}", Sha256::digest(base.as_bytes()));
    let tag = format!("~{}", &digest[..8]);
    let budget = MAX_SHEET_NAME_LEN.saturating_sub(suffix_len + tag.len());
    let prefix: String = base
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(budget)
        .collect();
    format!("{}{}{}", prefix, tag, suffix)
}
