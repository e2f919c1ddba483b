//! In-process workbook backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{CellRange, CellRef, Workbook, WorkbookError};

/// Sparse cell storage for one sheet, keyed by (row, col).
#[derive(Debug, Clone, Default)]
pub(crate) struct Sheet {
    cells: BTreeMap<(u32, u32), String>,
}

impl Sheet {
    /// Build a sheet from dense rows starting at A1.
    pub(crate) fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let mut sheet = Self::default();
        sheet.write(CellRef::default(), &rows);
        sheet
    }

    fn write(&mut self, anchor: CellRef, values: &[Vec<String>]) {
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let key = (anchor.row + r as u32, anchor.col + c as u32);
                if value.is_empty() {
                    self.cells.remove(&key);
                } else {
                    self.cells.insert(key, value.clone());
                }
            }
        }
    }

    fn clear(&mut self, range: &CellRange) {
        self.cells.retain(|&(row, col), _| !range.contains(CellRef::new(col, row)));
    }

    fn read(&self, range: &CellRange) -> Vec<Vec<String>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.cells.get(&(row, col)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Smallest A1-anchored range covering every non-empty cell.
    fn used_range(&self) -> Option<CellRange> {
        let max_row = self.cells.keys().map(|&(r, _)| r).max()?;
        let max_col = self.cells.keys().map(|&(_, c)| c).max()?;
        Some(CellRange::new(CellRef::default(), CellRef::new(max_col, max_row)))
    }

    /// Dense rows from A1 through the used range.
    pub(crate) fn to_rows(&self) -> Vec<Vec<String>> {
        self.used_range().map(|r| self.read(&r)).unwrap_or_default()
    }
}

/// Workbook kept entirely in memory.
///
/// Every call takes one lock over all sheets, so each write, read or
/// clear is atomic with respect to the others.
#[derive(Debug)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Mutex<HashMap<String, Sheet>>,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn with_sheets(name: impl Into<String>, sheets: HashMap<String, Sheet>) -> Self {
        Self {
            name: name.into(),
            sheets: Mutex::new(sheets),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Sheet>>, WorkbookError> {
        self.sheets.lock().map_err(|_| WorkbookError::LockPoisoned)
    }

    /// Value of a single cell, `None` when empty or the sheet is missing.
    pub fn cell(&self, sheet: &str, cell: &str) -> Option<String> {
        let cell: CellRef = cell.parse().ok()?;
        let sheets = self.lock().ok()?;
        sheets.get(sheet)?.cells.get(&(cell.row, cell.col)).cloned()
    }

    /// Smallest A1-anchored range covering the sheet's non-empty cells.
    pub fn used_range(&self, sheet: &str) -> Option<CellRange> {
        self.lock().ok()?.get(sheet)?.used_range()
    }

    /// Dense copy of a sheet, used by persisting backends.
    pub(crate) fn sheet_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, WorkbookError> {
        let sheets = self.lock()?;
        sheets
            .get(sheet)
            .map(Sheet::to_rows)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))
    }

    pub(crate) fn has_sheet(&self, sheet: &str) -> Result<bool, WorkbookError> {
        Ok(self.lock()?.contains_key(sheet))
    }

    /// Swap in a sheet loaded from elsewhere.
    pub(crate) fn replace_sheet(&self, sheet: &str, contents: Sheet) -> Result<(), WorkbookError> {
        self.lock()?.insert(sheet.to_string(), contents);
        Ok(())
    }
}

impl Workbook for MemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_sheet(&self, sheet: &str) -> Result<(), WorkbookError> {
        self.lock()?.entry(sheet.to_string()).or_default();
        Ok(())
    }

    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>, WorkbookError> {
        let sheets = self.lock()?;
        let sheet = sheets
            .get(sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        Ok(sheet.read(range))
    }

    fn write_range(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
    ) -> Result<(), WorkbookError> {
        self.lock()?
            .entry(sheet.to_string())
            .or_default()
            .write(anchor, values);
        Ok(())
    }

    fn clear_range(&self, sheet: &str, range: &CellRange) -> Result<(), WorkbookError> {
        if let Some(sheet) = self.lock()?.get_mut(sheet) {
            sheet.clear(range);
        }
        Ok(())
    }

    fn write_region(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
        clear: &[CellRange],
    ) -> Result<(), WorkbookError> {
        let mut sheets = self.lock()?;
        let target = sheets.entry(sheet.to_string()).or_default();
        target.write(anchor, values);
        for range in clear {
            target.clear(range);
        }
        Ok(())
    }

    fn sheet_names(&self) -> Result<Vec<String>, WorkbookError> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
