//! Delimited-text payload parsing.

use super::types::FeedError;

const BOM: char = '\u{feff}';

/// Parse a comma-delimited payload into rows of trimmed text cells.
///
/// A leading byte-order mark is stripped and rows whose cells are all
/// blank are dropped. Rows may have different lengths.
pub fn parse_table(payload: &str) -> Result<Vec<Vec<String>>, FeedError> {
    let payload = payload.strip_prefix(BOM).unwrap_or(payload);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FeedError::Parse(e.to_string()))?;
        let row: Vec<String> = record.iter().map(|cell| cell.trim().to_string()).collect();
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}
