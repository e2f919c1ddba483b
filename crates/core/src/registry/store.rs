//! Lock-guarded registry store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::feed::RallyClass;
use crate::metrics::REGISTRY_REFRESHES;
use crate::workbook::{CellRange, Workbook};

use super::RegistryRefreshError;

/// Racing number and active stage for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub racing_number: Option<String>,
    pub active_stage: Option<String>,
}

/// Registry of per-class entries shared between the export path and the
/// refresh trigger.
///
/// All access goes through a single mutex. Reads copy out of the lock and
/// the lock is never held across an await point.
#[derive(Debug, Default)]
pub struct RegistryStore {
    entries: Mutex<BTreeMap<RallyClass, RegistryEntry>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a consistent map: every write is a
    // single assignment.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<RallyClass, RegistryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Entry for one class.
    pub fn get(&self, class: RallyClass) -> Option<RegistryEntry> {
        self.lock().get(&class).cloned()
    }

    /// Snapshot of every entry.
    pub fn all(&self) -> BTreeMap<RallyClass, RegistryEntry> {
        self.lock().clone()
    }

    /// Racing number registered for `class`.
    pub fn racing_number(&self, class: RallyClass) -> Option<String> {
        self.lock()
            .get(&class)
            .and_then(|entry| entry.racing_number.clone())
    }

    /// Classes with an active stage, in class order.
    pub fn active_stages(&self) -> Vec<(RallyClass, String)> {
        self.lock()
            .iter()
            .filter_map(|(class, entry)| entry.active_stage.clone().map(|stage| (*class, stage)))
            .collect()
    }

    /// Replace the whole registry in one step.
    pub fn replace(&self, entries: BTreeMap<RallyClass, RegistryEntry>) {
        let count = entries.len();
        *self.lock() = entries;
        info!(entries = count, "Registry replaced");
    }

    /// Rebuild the registry from three parallel rows: class ids, racing
    /// numbers, active stages.
    ///
    /// Columns whose header is not a known class are skipped and blank
    /// cells are omitted. Returns `true` and replaces the registry when at
    /// least one racing number or stage was found; otherwise the registry
    /// is left untouched and `false` is returned.
    pub fn refresh_from_rows(&self, rows: &[Vec<String>]) -> bool {
        let empty = Vec::new();
        let headers = rows.first().unwrap_or(&empty);
        let numbers = rows.get(1).unwrap_or(&empty);
        let stages = rows.get(2).unwrap_or(&empty);

        let mut entries = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            let header = normalize_cell(header);
            if header.is_empty() {
                continue;
            }
            let Ok(class) = header.parse::<RallyClass>() else {
                debug!(column = i, header = %header, "Skipping registry column with unknown class");
                continue;
            };

            let entry = RegistryEntry {
                racing_number: non_blank(numbers.get(i)),
                active_stage: non_blank(stages.get(i)),
            };
            if entry.racing_number.is_some() || entry.active_stage.is_some() {
                entries.insert(class, entry);
            }
        }

        if entries.is_empty() {
            warn!("No racing numbers or stages found in registry range");
            REGISTRY_REFRESHES.with_label_values(&["empty"]).inc();
            return false;
        }

        self.replace(entries);
        REGISTRY_REFRESHES.with_label_values(&["updated"]).inc();
        true
    }

    /// Read `range` on `sheet` and refresh from it. Blocking.
    ///
    /// Read failures are logged and reported as `false`; the previous
    /// registry stays in place.
    pub fn refresh(&self, workbook: &dyn Workbook, sheet: &str, range: &CellRange) -> bool {
        match read_registry_rows(workbook, sheet, range) {
            Ok(rows) => self.refresh_from_rows(&rows),
            Err(e) => {
                error!(
                    workbook = workbook.name(),
                    sheet = sheet,
                    range = %range,
                    error = %e,
                    "Failed to read registry range"
                );
                REGISTRY_REFRESHES.with_label_values(&["error"]).inc();
                false
            }
        }
    }
}

fn read_registry_rows(
    workbook: &dyn Workbook,
    sheet: &str,
    range: &CellRange,
) -> Result<Vec<Vec<String>>, RegistryRefreshError> {
    let rows = workbook.read_range(sheet, range)?;
    if rows.len() < 3 {
        return Err(RegistryRefreshError::TooFewRows {
            range: range.to_string(),
            rows: rows.len(),
        });
    }
    Ok(rows)
}

fn non_blank(cell: Option<&String>) -> Option<String> {
    cell.map(|c| normalize_cell(c)).filter(|c| !c.is_empty())
}

/// Trim a cell and turn whole floats such as `42.0` into `42`.
///
/// Spreadsheets hand numbers back as floats, so an id typed as `3` may be
/// read as `3.0`.
pub fn normalize_cell(cell: &str) -> String {
    let trimmed = cell.trim();
    if let Some(integer) = trimmed.strip_suffix(".0") {
        if !integer.is_empty() && integer.chars().all(|c| c.is_ascii_digit()) {
            return integer.to_string();
        }
    }
    trimmed.to_string()
}
