//! Derived view: the rows of one class's registered racing number.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::bus::{Sink, SinkError};
use crate::feed::TabularResponse;
use crate::filter::RACING_NUMBER_COLUMN;
use crate::registry::{normalize_cell, RegistryStore};
use crate::workbook::{fit_sheet_name, Workbook};

use super::sheet::{sheet_base, RegionWriter};

/// Writes the header plus every row whose racing number matches the one
/// registered for the table's class, to `<sheet>_RSz`.
///
/// Classes without a registered racing number are skipped.
pub struct RacingNumberViewSink {
    registry: Arc<RegistryStore>,
    workbook: Arc<dyn Workbook>,
    writer: RegionWriter,
}

impl RacingNumberViewSink {
    pub fn new(registry: Arc<RegistryStore>, workbook: Arc<dyn Workbook>, writer: RegionWriter) -> Self {
        Self {
            registry,
            workbook,
            writer,
        }
    }

    /// Sheet that holds the view of `table`. The `_RSz` suffix survives
    /// shortening, so the view never lands on the table's own sheet.
    pub fn view_sheet_name(table: &TabularResponse) -> String {
        fit_sheet_name(&sheet_base(table), &format!("_{}", RACING_NUMBER_COLUMN))
    }
}

/// Header plus the rows whose racing number equals `number`.
fn select_rows(rows: &[Vec<String>], number: &str) -> Option<Vec<Vec<String>>> {
    let header = rows.first()?;
    let column = header
        .iter()
        .position(|h| h.trim() == RACING_NUMBER_COLUMN)?;

    let mut selected = vec![header.clone()];
    selected.extend(
        rows.iter()
            .skip(1)
            .filter(|row| row.get(column).is_some_and(|cell| normalize_cell(cell) == number))
            .cloned(),
    );
    Some(selected)
}

#[async_trait]
impl Sink for RacingNumberViewSink {
    fn name(&self) -> &str {
        "racing_number_view"
    }

    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError> {
        let Some(number) = self.registry.racing_number(table.class()) else {
            debug!(class = %table.class(), "No racing number registered, view skipped");
            return Ok(());
        };

        let rows = select_rows(table.rows(), &number).ok_or_else(|| {
            SinkError::Rejected(format!(
                "{} has no {} column",
                table.resource_key(),
                RACING_NUMBER_COLUMN
            ))
        })?;
        let matched = rows.len() - 1;

        let sheet = Self::view_sheet_name(table);
        let workbook = Arc::clone(&self.workbook);
        let writer = self.writer;
        let target = sheet.clone();
        tokio::task::spawn_blocking(move || writer.write(workbook.as_ref(), &target, &rows))
            .await
            .map_err(|e| SinkError::Blocking(e.to_string()))??;

        info!(
            class = %table.class(),
            racing_number = %number,
            sheet = %sheet,
            matched,
            "Exported racing number view"
        );
        Ok(())
    }
}
