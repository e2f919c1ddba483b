//! Racing-number row filter applied to every successful fetch.
//!
//! Rows for course and safety cars carry racing numbers above
//! [`RACING_NUMBER_THRESHOLD`] and are dropped before any sink sees them.

use tracing::{debug, warn};

use crate::feed::TabularResponse;
use crate::metrics::ROWS_FILTERED;

/// Header of the column holding the racing number.
pub const RACING_NUMBER_COLUMN: &str = "RSz";

/// Rows whose racing number is strictly above this value are dropped.
pub const RACING_NUMBER_THRESHOLD: i64 = 900;

/// Drop data rows whose racing number is an integer above the threshold.
///
/// The header is always kept. Empty, non-numeric or missing values are
/// kept. Without a racing-number column the rows pass through unchanged.
pub fn filter_rows(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let Some(header) = rows.first() else {
        return rows;
    };

    let Some(column) = header.iter().position(|h| h.trim() == RACING_NUMBER_COLUMN) else {
        warn!(
            column = RACING_NUMBER_COLUMN,
            "Racing number column not in header, rows not filtered"
        );
        return rows;
    };

    let before = rows.len();
    let mut iter = rows.into_iter();
    let mut kept: Vec<Vec<String>> = iter.next().into_iter().collect();
    kept.extend(iter.filter(|row| !exceeds_threshold(row.get(column))));

    let dropped = before - kept.len();
    if dropped > 0 {
        debug!(dropped, "Filtered rows above racing number threshold");
        ROWS_FILTERED.inc_by(dropped as u64);
    }
    kept
}

/// Apply [`filter_rows`] to a response, producing a new response.
pub fn filter_table(table: &TabularResponse) -> TabularResponse {
    table.with_rows(filter_rows(table.rows().to_vec()))
}

fn exceeds_threshold(cell: Option<&String>) -> bool {
    cell.and_then(|value| value.trim().parse::<i64>().ok())
        .is_some_and(|number| number > RACING_NUMBER_THRESHOLD)
}
