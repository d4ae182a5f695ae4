use cellmap_common::{CellRef, CellValue};
use std::io::Write;
use std::path::Path;

/// Where a file-backed grid should persist its contents.
pub enum SaveDestination<'a> {
    /// Overwrite the path the grid was opened from.
    InPlace,
    Path(&'a Path),
    Writer(&'a mut dyn Write),
    /// Return the serialized bytes.
    Bytes,
}

/// Read access to a sheet-addressed cell grid. Coordinates are 1-based.
pub trait GridReader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Result<Vec<String>, Self::Error>;

    /// `(max_row, max_col)` of the used area, `None` for an empty or unknown
    /// sheet.
    fn sheet_bounds(&self, sheet: &str) -> Option<(u32, u32)>;

    fn read_cell(&self, sheet: &str, row: u32, col: u32)
    -> Result<Option<CellValue>, Self::Error>;

    fn has_sheet(&self, sheet: &str) -> Result<bool, Self::Error> {
        Ok(self.sheet_names()?.iter().any(|name| name == sheet))
    }

    /// Cell text of `row` from `start_col` to the right edge of the used area.
    /// Trailing blank cells are dropped, so a blank row reads as empty.
    fn read_row(&self, sheet: &str, row: u32, start_col: u32) -> Result<Vec<String>, Self::Error> {
        let Some((_, max_col)) = self.sheet_bounds(sheet) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for col in start_col.max(1)..=max_col {
            let text = self
                .read_cell(sheet, row, col)?
                .map(|value| value.to_text())
                .unwrap_or_default();
            out.push(text);
        }
        while out.last().is_some_and(|text| text.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    /// Iterate rows from `origin` down to the last used row.
    fn rows<'a>(&'a self, sheet: &'a str, origin: CellRef) -> RowCursor<'a, Self>
    where
        Self: Sized,
    {
        let last_row = self.sheet_bounds(sheet).map(|(rows, _)| rows).unwrap_or(0);
        RowCursor {
            grid: self,
            sheet,
            next_row: origin.row,
            last_row,
            start_col: origin.col,
        }
    }
}

/// Write access to a sheet-addressed cell grid. Coordinates are 1-based.
pub trait GridWriter {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store `value`; `CellValue::Empty` clears the cell.
    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: CellValue,
    ) -> Result<(), Self::Error>;

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Row iterator returned by [`GridReader::rows`]. Yields the 1-based row
/// number with the row's cell text and stops after the last used row.
pub struct RowCursor<'a, G: GridReader> {
    grid: &'a G,
    sheet: &'a str,
    next_row: u32,
    last_row: u32,
    start_col: u32,
}

impl<G: GridReader> Iterator for RowCursor<'_, G> {
    type Item = Result<(u32, Vec<String>), G::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row == 0 || self.next_row > self.last_row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;
        Some(
            self.grid
                .read_row(self.sheet, row, self.start_col)
                .map(|cells| (row, cells)),
        )
    }
}
