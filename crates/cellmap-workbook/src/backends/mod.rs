#[cfg(feature = "csv")]
pub mod csv;
pub mod memory;

#[cfg(feature = "csv")]
pub use csv::CsvAdapter;
pub use memory::MemoryGrid;

use cellmap_common::CellValue;
use std::collections::BTreeMap;

/// Sparse cell storage shared by the in-process backends.
#[derive(Clone, Debug, Default)]
pub(crate) struct SparseSheet {
    /// Only non-empty cells are stored.
    pub(crate) cells: BTreeMap<(u32, u32), CellValue>,
    /// Maximum row index seen (1-based).
    pub(crate) max_row: u32,
    /// Maximum column index seen (1-based).
    pub(crate) max_col: u32,
}

impl SparseSheet {
    pub(crate) fn bounds(&self) -> Option<(u32, u32)> {
        if self.max_row == 0 || self.max_col == 0 {
            None
        } else {
            Some((self.max_row, self.max_col))
        }
    }

    pub(crate) fn set_bounds(&mut self, rows: u32, cols: u32) {
        self.max_row = self.max_row.max(rows);
        self.max_col = self.max_col.max(cols);
    }

    pub(crate) fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Blank values clear the cell but still widen the used area, so a header
    /// written with trailing blanks keeps its width.
    pub(crate) fn put(&mut self, row: u32, col: u32, value: CellValue) {
        self.set_bounds(row, col);
        if value.is_blank() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }
}
