//! Flat-file sink.

use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::bus::{Sink, SinkError};
use crate::feed::{is_safe_stage_id, TabularResponse};

/// Writes each table to `<output_dir>/<file_stem>_<class>[_<stage>].csv`.
///
/// Every write goes to its own temp file next to the destination, which is
/// then renamed into place: readers never see a half-written table, and
/// concurrent deliveries of the same table leave one complete file.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    output_dir: PathBuf,
    delimiter: u8,
}

impl CsvFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            delimiter,
        }
    }

    /// Destination file for `table`. Stage ids that are not plain names
    /// are rejected rather than joined into the path.
    pub fn path_for(&self, table: &TabularResponse) -> Result<PathBuf, SinkError> {
        if let Some(stage) = table.stage_id() {
            if !is_safe_stage_id(stage) {
                return Err(SinkError::Rejected(format!(
                    "stage id '{}' is not usable in a file name",
                    stage
                )));
            }
        }
        Ok(self.output_dir.join(format!("{}.csv", table.resource_key())))
    }
}

fn write_table(path: &Path, delimiter: u8, rows: &[Vec<String>]) -> Result<(), SinkError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().flush()?;

    tmp.persist(path).map_err(|e| SinkError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl Sink for CsvFileSink {
    fn name(&self) -> &str {
        "csv_file"
    }

    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError> {
        let path = self.path_for(table)?;
        let rows = table.rows().to_vec();
        let delimiter = self.delimiter;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_table(&target, delimiter, &rows))
            .await
            .map_err(|e| SinkError::Blocking(e.to_string()))??;

        info!(
            path = %path.display(),
            rows = table.data_row_count(),
            "Exported table to CSV"
        );
        Ok(())
    }
}
