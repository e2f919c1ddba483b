//! Directory-backed workbook: one CSV file per sheet.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::memory::{MemoryWorkbook, Sheet};
use super::{CellRange, CellRef, Workbook, WorkbookError};

const EXTENSION: &str = "csv";

/// Workbook persisted as `<dir>/<sheet>.csv`.
///
/// The files are the source of truth: every call re-reads the sheet it
/// touches, so edits made by other programs are picked up, and every
/// mutation rewrites the sheet through a temp file renamed into place, so
/// an external reader always sees complete sheets.
#[derive(Debug)]
pub struct CsvDirWorkbook {
    dir: PathBuf,
    name: String,
    cells: MemoryWorkbook,
    /// Held across load, mutate and persist.
    op: Mutex<()>,
}

impl CsvDirWorkbook {
    /// Open (or create) the workbook directory and load its sheets.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, WorkbookError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut sheets = HashMap::new();
        for (sheet, path) in sheet_files(&dir)? {
            let rows = read_sheet_file(&path).map_err(|message| WorkbookError::Persist {
                sheet: sheet.clone(),
                message,
            })?;
            debug!(sheet = %sheet, rows = rows.len(), "Loaded sheet");
            sheets.insert(sheet, Sheet::from_rows(rows));
        }

        let name = dir.display().to_string();
        info!(workbook = %name, sheets = sheets.len(), "Opened CSV directory workbook");

        Ok(Self {
            cells: MemoryWorkbook::with_sheets(name.clone(), sheets),
            dir,
            name,
            op: Mutex::new(()),
        })
    }

    /// Path of the file backing `sheet`.
    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", sheet, EXTENSION))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, WorkbookError> {
        self.op.lock().map_err(|_| WorkbookError::LockPoisoned)
    }

    /// Replace the cached copy of `sheet` with what is on disk, if the
    /// file exists.
    fn load(&self, sheet: &str) -> Result<(), WorkbookError> {
        let path = self.sheet_path(sheet);
        if !path.is_file() {
            return Ok(());
        }
        let rows = read_sheet_file(&path).map_err(|message| WorkbookError::Persist {
            sheet: sheet.to_string(),
            message,
        })?;
        self.cells.replace_sheet(sheet, Sheet::from_rows(rows))
    }

    fn persist(&self, sheet: &str) -> Result<(), WorkbookError> {
        let rows = self.cells.sheet_rows(sheet)?;
        let path = self.sheet_path(sheet);

        let persist_err = |message: String| WorkbookError::Persist {
            sheet: sheet.to_string(),
            message,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(tmp.as_file_mut());
            for row in &rows {
                writer
                    .write_record(row)
                    .map_err(|e| persist_err(e.to_string()))?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;

        tmp.persist(&path).map_err(|e| WorkbookError::Io(e.error))?;
        debug!(sheet = sheet, rows = rows.len(), "Persisted sheet");
        Ok(())
    }
}

/// `(sheet, path)` for every CSV file in `dir`.
fn sheet_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, WorkbookError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        let Some(sheet) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((sheet.to_string(), path.clone()));
    }
    Ok(files)
}

fn read_sheet_file(path: &Path) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| e.to_string())
        })
        .collect()
}

impl Workbook for CsvDirWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_sheet(&self, sheet: &str) -> Result<(), WorkbookError> {
        let _guard = self.guard()?;
        self.load(sheet)?;
        if self.cells.has_sheet(sheet)? {
            return Ok(());
        }
        self.cells.ensure_sheet(sheet)?;
        self.persist(sheet)
    }

    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>, WorkbookError> {
        let _guard = self.guard()?;
        self.load(sheet)?;
        self.cells.read_range(sheet, range)
    }

    fn write_range(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
    ) -> Result<(), WorkbookError> {
        let _guard = self.guard()?;
        self.load(sheet)?;
        self.cells.write_range(sheet, anchor, values)?;
        self.persist(sheet)
    }

    fn clear_range(&self, sheet: &str, range: &CellRange) -> Result<(), WorkbookError> {
        let _guard = self.guard()?;
        self.load(sheet)?;
        if !self.cells.has_sheet(sheet)? {
            return Ok(());
        }
        self.cells.clear_range(sheet, range)?;
        self.persist(sheet)
    }

    fn write_region(
        &self,
        sheet: &str,
        anchor: CellRef,
        values: &[Vec<String>],
        clear: &[CellRange],
    ) -> Result<(), WorkbookError> {
        let _guard = self.guard()?;
        self.load(sheet)?;
        self.cells.write_region(sheet, anchor, values, clear)?;
        self.persist(sheet)
    }

    fn sheet_names(&self) -> Result<Vec<String>, WorkbookError> {
        let _guard = self.guard()?;
        let mut names: BTreeSet<String> = self.cells.sheet_names()?.into_iter().collect();
        names.extend(sheet_files(&self.dir)?.into_iter().map(|(sheet, _)| sheet));
        Ok(names.into_iter().collect())
    }
}
