use super::SparseSheet;
use crate::error::IoError;
use crate::traits::{GridReader, GridWriter};
use cellmap_common::CellValue;

#[derive(Clone, Debug)]
struct NamedSheet {
    name: String,
    data: SparseSheet,
}

/// Multi-sheet grid held entirely in memory.
///
/// Sheets keep insertion order, which is the order `sheet_names` reports and
/// the order index-based sheet selection uses.
#[derive(Clone, Debug, Default)]
pub struct MemoryGrid {
    sheets: Vec<NamedSheet>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// A grid with one empty sheet.
    pub fn with_sheet(name: &str) -> Self {
        Self {
            sheets: vec![NamedSheet {
                name: name.to_string(),
                data: SparseSheet::default(),
            }],
        }
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<(), IoError> {
        if self.sheet(name).is_some() {
            return Err(IoError::SheetExists(name.to_string()));
        }
        self.sheets.push(NamedSheet {
            name: name.to_string(),
            data: SparseSheet::default(),
        });
        Ok(())
    }

    pub fn set_value(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
    ) -> Result<(), IoError> {
        self.write_cell(sheet, row, col, value.into())
    }

    pub fn get_value(&self, sheet: &str, row: u32, col: u32) -> Option<&CellValue> {
        self.sheet(sheet)?.get(row, col)
    }

    /// Rectangular text dump of the used area, starting at `A1`.
    pub fn sheet_text(&self, sheet: &str) -> Vec<Vec<String>> {
        let Some(data) = self.sheet(sheet) else {
            return Vec::new();
        };
        let Some((rows, cols)) = data.bounds() else {
            return Vec::new();
        };
        (1..=rows)
            .map(|r| {
                (1..=cols)
                    .map(|c| data.get(r, c).map(CellValue::to_text).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    fn sheet(&self, name: &str) -> Option<&SparseSheet> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.data)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SparseSheet, IoError> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| &mut s.data)
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))
    }
}

impl GridReader for MemoryGrid {
    type Error = IoError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn sheet_bounds(&self, sheet: &str) -> Option<(u32, u32)> {
        self.sheet(sheet)?.bounds()
    }

    fn read_cell(
        &self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellValue>, Self::Error> {
        let data = self
            .sheet(sheet)
            .ok_or_else(|| IoError::SheetNotFound(sheet.to_string()))?;
        Ok(data.get(row, col).cloned())
    }

    fn has_sheet(&self, sheet: &str) -> Result<bool, Self::Error> {
        Ok(self.sheet(sheet).is_some())
    }
}

impl GridWriter for MemoryGrid {
    type Error = IoError;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: CellValue,
    ) -> Result<(), Self::Error> {
        if row == 0 || col == 0 {
            return Err(IoError::InvalidCoordinate { row, col });
        }
        self.sheet_mut(sheet)?.put(row, col, value);
        Ok(())
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        if self.sheet(name).is_some() {
            return Ok(());
        }
        self.add_sheet(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmap_common::CellRef;

    #[test]
    fn rows_trim_trailing_blanks_and_stop_at_bounds() {
        let mut grid = MemoryGrid::with_sheet("Data");
        grid.set_value("Data", 1, 1, "a").unwrap();
        grid.set_value("Data", 1, 3, "c").unwrap();
        grid.set_value("Data", 2, 1, 7i64).unwrap();
        grid.set_value("Data", 3, 2, "").unwrap();

        let rows: Vec<_> = grid
            .rows("Data", CellRef::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (1, vec!["a".to_string(), String::new(), "c".to_string()]),
                (2, vec!["7".to_string()]),
                (3, vec![]),
            ]
        );
    }

    #[test]
    fn rows_honor_origin_column() {
        let mut grid = MemoryGrid::with_sheet("S");
        grid.set_value("S", 2, 2, "x").unwrap();
        grid.set_value("S", 2, 3, "y").unwrap();
        let rows: Vec<_> = grid
            .rows("S", CellRef::parse_a1("B2").unwrap())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows, vec![(2, vec!["x".to_string(), "y".to_string()])]);
    }

    #[test]
    fn unknown_sheet_is_an_error_for_cells_but_not_bounds() {
        let mut grid = MemoryGrid::new();
        assert!(grid.sheet_bounds("nope").is_none());
        assert!(matches!(
            grid.read_cell("nope", 1, 1),
            Err(IoError::SheetNotFound(_))
        ));
        assert!(matches!(
            grid.write_cell("nope", 1, 1, CellValue::Int(1)),
            Err(IoError::SheetNotFound(_))
        ));
        grid.create_sheet("nope").unwrap();
        grid.create_sheet("nope").unwrap();
        assert_eq!(grid.sheet_names().unwrap(), vec!["nope".to_string()]);
        assert!(matches!(grid.add_sheet("nope"), Err(IoError::SheetExists(_))));
    }

    #[test]
    fn zero_coordinates_are_rejected() {
        let mut grid = MemoryGrid::with_sheet("S");
        assert!(matches!(
            grid.write_cell("S", 0, 1, CellValue::Int(1)),
            Err(IoError::InvalidCoordinate { row: 0, col: 1 })
        ));
    }
}
