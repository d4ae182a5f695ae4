//! Fixture helpers shared by the cellmap test suites.

use cellmap_common::CellRef;
use cellmap_workbook::{GridWriter, MemoryGrid};
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a single-sheet grid whose rows start at `origin` (A1 notation).
/// Empty strings leave the cell unset.
pub fn grid_from_rows(sheet: &str, origin: &str, rows: &[&[&str]]) -> MemoryGrid {
    let mut grid = MemoryGrid::with_sheet(sheet);
    fill_rows(&mut grid, sheet, origin, rows);
    grid
}

/// Write `rows` into an existing sheet, starting at `origin`.
pub fn fill_rows(grid: &mut MemoryGrid, sheet: &str, origin: &str, rows: &[&[&str]]) {
    let origin = CellRef::parse_a1(origin).expect("fixture origin must be A1 notation");
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            grid.write_cell(
                sheet,
                origin.row + r as u32,
                origin.col + c as u32,
                (*text).into(),
            )
            .expect("fixture sheet must exist");
        }
    }
}

/// A temp directory plus a file path inside it; keep the `TempDir` alive for
/// as long as the path is used.
pub fn temp_path(file_name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(file_name);
    (dir, path)
}
