//! Spreadsheet region sink.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::bus::{Sink, SinkError};
use crate::feed::TabularResponse;
use crate::workbook::{clean_sheet_name, CellRange, CellRef, Workbook, WorkbookError};

/// Uncleaned sheet name for `table`: `<sheet_stem>_<class>[_<stage>]`.
pub fn sheet_base(table: &TabularResponse) -> String {
    match table.stage_id() {
        Some(stage) => format!("{}_{}_{}", table.kind().sheet_stem(), table.class(), stage),
        None => format!("{}_{}", table.kind().sheet_stem(), table.class()),
    }
}

/// Sheet that holds `table`.
pub fn sheet_name(table: &TabularResponse) -> String {
    clean_sheet_name(&sheet_base(table))
}

/// Pad ragged rows with empty cells up to the widest row.
pub fn pad_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let mut padded = row.clone();
            padded.resize(width, String::new());
            padded
        })
        .collect()
}

/// Writes a table as one rectangular region and clears the margin a
/// previous, larger write may have left behind.
///
/// For a region of `w × h` cells at the anchor, the cleared margin is:
/// - `clean_cols` columns right of the region, `h` rows tall
/// - `clean_rows` rows below the region, `w` columns wide
/// - the `clean_cols × clean_rows` corner between them
#[derive(Debug, Clone, Copy)]
pub struct RegionWriter {
    pub anchor: CellRef,
    pub clean_rows: u32,
    pub clean_cols: u32,
}

impl Default for RegionWriter {
    fn default() -> Self {
        Self {
            anchor: CellRef::default(),
            clean_rows: 0,
            clean_cols: 0,
        }
    }
}

impl RegionWriter {
    pub fn new(anchor: CellRef, clean_rows: u32, clean_cols: u32) -> Self {
        Self {
            anchor,
            clean_rows,
            clean_cols,
        }
    }

    /// Region covered by a table of `width × height` cells.
    pub fn region(&self, width: u32, height: u32) -> Option<CellRange> {
        CellRange::from_anchor(self.anchor, width, height)
    }

    /// Ranges cleared after writing a `width × height` region.
    pub fn clean_ranges(&self, width: u32, height: u32) -> Vec<CellRange> {
        let right = CellRange::from_anchor(self.anchor.offset(width, 0), self.clean_cols, height);
        let below = CellRange::from_anchor(self.anchor.offset(0, height), width, self.clean_rows);
        let corner = CellRange::from_anchor(
            self.anchor.offset(width, height),
            self.clean_cols,
            self.clean_rows,
        );
        [right, below, corner].into_iter().flatten().collect()
    }

    /// Write `rows` to `sheet`, creating it if needed. Blocking.
    ///
    /// The region and its cleared margin go to the workbook as a single
    /// `write_region` call. Returns the written region, or `None` when there
    /// was nothing to write.
    pub fn write(
        &self,
        workbook: &dyn Workbook,
        sheet: &str,
        rows: &[Vec<String>],
    ) -> Result<Option<CellRange>, WorkbookError> {
        let values = pad_rows(rows);
        let height = values.len() as u32;
        let width = values.first().map_or(0, |row| row.len() as u32);
        let Some(region) = self.region(width, height) else {
            debug!(sheet = sheet, "Nothing to write");
            workbook.ensure_sheet(sheet)?;
            return Ok(None);
        };

        let clean = self.clean_ranges(width, height);
        debug!(sheet = sheet, region = %region, cleared = clean.len(), "Writing region");
        workbook.write_region(sheet, self.anchor, &values, &clean)?;

        Ok(Some(region))
    }
}

/// Writes each table to its own sheet of the shared workbook.
pub struct SpreadsheetSink {
    workbook: Arc<dyn Workbook>,
    writer: RegionWriter,
}

impl SpreadsheetSink {
    pub fn new(workbook: Arc<dyn Workbook>, writer: RegionWriter) -> Self {
        Self { workbook, writer }
    }
}

#[async_trait]
impl Sink for SpreadsheetSink {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError> {
        let sheet = sheet_name(table);
        let rows = table.rows().to_vec();
        let workbook = Arc::clone(&self.workbook);
        let writer = self.writer;

        let target = sheet.clone();
        let region = tokio::task::spawn_blocking(move || writer.write(workbook.as_ref(), &target, &rows))
            .await
            .map_err(|e| SinkError::Blocking(e.to_string()))??;

        if let Some(region) = region {
            info!(
                workbook = self.workbook.name(),
                sheet = %sheet,
                region = %region,
                "Exported table to sheet"
            );
        }
        Ok(())
    }
}
