//! A1-style cell coordinates used to anchor a scan origin on a sheet.
//!
//! Rows and columns are 1-based, matching the notation humans type into a
//! spreadsheet. Limits follow Excel: 1,048,576 rows × 16,384 columns.

use core::fmt;
use core::str::FromStr;

pub const MAX_ROW: u32 = 1 << 20;
pub const MAX_COL: u32 = 1 << 14;

/// Errors returned when building a coordinate from unchecked input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordError {
    Empty,
    Malformed(String),
    RowOutOfRange(u64),
    ColOutOfRange(u64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::Empty => write!(f, "cell reference is empty"),
            CoordError::Malformed(s) => write!(f, "`{s}` is not an A1 cell reference"),
            CoordError::RowOutOfRange(row) => {
                write!(f, "row {row} is outside 1..={MAX_ROW}")
            }
            CoordError::ColOutOfRange(col) => {
                write!(f, "column {col} is outside 1..={MAX_COL}")
            }
        }
    }
}

impl std::error::Error for CoordError {}

/// A 1-based (row, column) cell position.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl Default for CellRef {
    fn default() -> Self {
        Self { row: 1, col: 1 }
    }
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Result<Self, CoordError> {
        if row == 0 || row > MAX_ROW {
            return Err(CoordError::RowOutOfRange(row as u64));
        }
        if col == 0 || col > MAX_COL {
            return Err(CoordError::ColOutOfRange(col as u64));
        }
        Ok(Self { row, col })
    }

    /// Parse `B3`, `$B$3` or `b3`.
    pub fn parse_a1(text: &str) -> Result<Self, CoordError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CoordError::Empty);
        }
        let cleaned: String = trimmed
            .chars()
            .filter(|c| *c != '$')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| CoordError::Malformed(text.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let col = letters_to_column(letters).ok_or_else(|| CoordError::Malformed(text.to_string()))?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoordError::Malformed(text.to_string()));
        }
        let row: u64 = digits
            .parse()
            .map_err(|_| CoordError::Malformed(text.to_string()))?;
        if row == 0 || row > MAX_ROW as u64 {
            return Err(CoordError::RowOutOfRange(row));
        }
        Self::new(row as u32, col)
    }

    /// The cell `rows` below and `cols` right of this one.
    pub fn offset(self, rows: u32, cols: u32) -> Self {
        Self {
            row: self.row.saturating_add(rows),
            col: self.col.saturating_add(cols),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s)
    }
}

/// Convert a 1-based column index into letters (`1 -> A`, `27 -> AA`).
pub fn column_to_letters(col: u32) -> String {
    let mut col = col.max(1);
    let mut buf = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        buf.push(char::from(b'A' + rem));
        col = (col - 1) / 26;
    }
    buf.iter().rev().collect()
}

/// Convert uppercase column letters into a 1-based index.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add((ch - b'A') as u32 + 1)?;
    }
    (col <= MAX_COL).then_some(col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_and_lowercase() {
        assert_eq!(CellRef::parse_a1("$C$7").unwrap(), CellRef { row: 7, col: 3 });
        assert_eq!(CellRef::parse_a1("ab12").unwrap(), CellRef { row: 12, col: 28 });
        assert_eq!(CellRef::parse_a1("A1").unwrap(), CellRef::default());
    }

    #[test]
    fn rejects_bad_references() {
        assert_eq!(CellRef::parse_a1(""), Err(CoordError::Empty));
        assert!(matches!(CellRef::parse_a1("12"), Err(CoordError::Malformed(_))));
        assert!(matches!(CellRef::parse_a1("A"), Err(CoordError::Malformed(_))));
        assert!(matches!(CellRef::parse_a1("A1B"), Err(CoordError::Malformed(_))));
        assert_eq!(CellRef::parse_a1("A0"), Err(CoordError::RowOutOfRange(0)));
        assert!(matches!(CellRef::parse_a1("ZZZZ1"), Err(CoordError::Malformed(_))));
    }

    #[test]
    fn column_letter_roundtrip() {
        for col in [1, 26, 27, 52, 702, 703, MAX_COL] {
            let letters = column_to_letters(col);
            assert_eq!(letters_to_column(&letters), Some(col));
        }
        assert_eq!(column_to_letters(28), "AB");
        assert_eq!(CellRef { row: 4, col: 28 }.to_string(), "AB4");
    }
}
