//! A1-style cell addressing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::WorkbookError;

/// Column letters for a 1-based column number: 1 → `A`, 26 → `Z`,
/// 27 → `AA`, 52 → `AZ`, 53 → `BA`.
///
/// Column 0 does not exist and yields an empty string.
pub fn column_letter(mut n: u32) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letter`]. Case-insensitive; `None` for empty input,
/// non-letters or overflow.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A single cell, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Cell `cols` to the right and `rows` below this one.
    pub fn offset(&self, cols: u32, rows: u32) -> Self {
        Self {
            col: self.col + cols,
            row: self.row + rows,
        }
    }
}

impl Default for CellRef {
    fn default() -> Self {
        Self { col: 1, row: 1 }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = WorkbookError;

    /// Parses `B7`, `b7` or `$B$7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WorkbookError::InvalidRange(s.to_string());
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);

        let col = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { col, row })
    }
}

/// Inclusive rectangle of cells. `start` is always the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Normalizes the corners so that `start` is top-left.
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.col.min(b.col), a.row.min(b.row)),
            end: CellRef::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Range of `cols` × `rows` cells starting at `anchor`; `None` when
    /// either dimension is zero.
    pub fn from_anchor(anchor: CellRef, cols: u32, rows: u32) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }
        Some(Self {
            start: anchor,
            end: anchor.offset(cols - 1, rows - 1),
        })
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.col..=self.end.col).contains(&cell.col)
            && (self.start.row..=self.end.row).contains(&cell.row)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for CellRange {
    type Err = WorkbookError;

    /// Parses `A1:C3`; a single cell `B2` is a 1×1 range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse()?, b.parse()?)),
            None => {
                let cell: CellRef = s.parse()?;
                Ok(Self::new(cell, cell))
            }
        }
    }
}
