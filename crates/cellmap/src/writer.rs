//! Marshal: a slice of elements into grid rows.

use crate::columns::bind_write;
use crate::container::{Element, Layout, Slot};
use crate::error::{ConfigError, Error};
use crate::options::{OperationResult, SheetSelector, WriteOptions};
use crate::schema::{Schema, TagOverrides};
use crate::session::{LayoutCache, Target};
use cellmap_common::coord::column_to_letters;
use cellmap_common::{CellRef, CellValue, Direction};
use cellmap_workbook::{GridReader, GridWriter};
use std::collections::BTreeSet;

/// Writes tables into one grid. An existing header row at the origin is
/// kept: fields land under their existing columns and new fields are
/// appended to the right.
///
/// Every cell is encoded before the grid is touched, so a failed call
/// leaves the grid as it was.
pub struct Writer<'g, G: GridReader + GridWriter> {
    grid: &'g mut G,
    options: WriteOptions,
    layouts: LayoutCache,
}

/// Cells of one call, encoded and waiting to be written.
#[derive(Default)]
struct Staged {
    cells: Vec<(u32, u32, CellValue)>,
    result: OperationResult,
}

impl Staged {
    fn put(&mut self, row: u32, col: u32, value: CellValue) {
        self.cells.push((row, col, value));
    }
}

fn data_row(origin: CellRef, index: usize) -> u32 {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    origin.row.saturating_add(1).saturating_add(index)
}

fn column_at(origin: CellRef, offset: usize) -> u32 {
    let offset = u32::try_from(offset).unwrap_or(u32::MAX);
    origin.col.saturating_add(offset)
}

impl<'g, G: GridReader + GridWriter> Writer<'g, G> {
    pub fn new(grid: &'g mut G) -> Self {
        Self::with_options(grid, WriteOptions::default())
    }

    pub fn with_options(grid: &'g mut G, options: WriteOptions) -> Self {
        Self {
            grid,
            options,
            layouts: LayoutCache::default(),
        }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn marshal<E: Element>(&mut self, source: &[E]) -> Result<OperationResult, Error> {
        self.marshal_with(source, &TagOverrides::default())
    }

    /// Like [`Writer::marshal`], with per-field tags that replace the write
    /// channel of the named fields for this call only.
    pub fn marshal_with<E: Element>(
        &mut self,
        source: &[E],
        overrides: &TagOverrides,
    ) -> Result<OperationResult, Error> {
        let (place, create) = self.target()?;

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "marshal",
            element = std::any::type_name::<E>(),
            sheet = %place.sheet,
            origin = %place.origin,
            len = source.len()
        )
        .entered();

        let layout = self.layouts.get::<E>();
        let staged = match &*layout {
            Layout::Record(schema) => self.stage_records(schema, overrides, &place, source)?,
            Layout::Sequence => self.stage_sequences(&place, source)?,
            Layout::Map => self.stage_maps(&place, source)?,
        };

        if create {
            self.grid.create_sheet(&place.sheet).map_err(Error::grid)?;
        }
        for (row, col, value) in staged.cells {
            self.grid
                .write_cell(&place.sheet, row, col, value)
                .map_err(Error::grid)?;
        }
        self.grid.flush().map_err(Error::grid)?;
        let result = staged.result;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows = result.rows,
            columns = result.columns,
            skipped = result.skipped,
            "marshal finished"
        );

        Ok(result)
    }

    /// The call's sheet and origin, and whether the sheet has to be created
    /// before writing.
    fn target(&self) -> Result<(Target, bool), Error> {
        if let SheetSelector::Name(name) = &self.options.sheet {
            if !self.grid.has_sheet(name).map_err(Error::grid)? {
                if !self.options.create_missing_sheet {
                    return Err(ConfigError::SheetNotFound(name.clone()).into());
                }
                return Ok((Target::pending(name, &self.options.origin)?, true));
            }
        }
        let place = Target::resolve(&*self.grid, &self.options.sheet, &self.options.origin)?;
        Ok((place, false))
    }

    fn header(&self, place: &Target) -> Result<Vec<String>, Error> {
        self.grid
            .read_row(&place.sheet, place.origin.row, place.origin.col)
            .map_err(Error::grid)
    }

    fn stage_records<E: Element>(
        &self,
        schema: &Schema,
        overrides: &TagOverrides,
        place: &Target,
        source: &[E],
    ) -> Result<Staged, Error> {
        let tags = schema.resolve(Direction::Write, overrides);
        if tags.iter().all(|tag| tag.ignore) {
            return Err(Error::UnsupportedShape {
                element: schema.element(),
                direction: Direction::Write,
            });
        }

        let bindings = bind_write(&tags, &self.header(place)?);
        let mut staged = Staged::default();
        staged.result.rows = source.len();
        staged.result.columns = bindings.bound_count();

        for (position, offset) in bindings.iter() {
            let name = CellValue::Text(tags[position].column.to_string());
            staged.put(place.origin.row, column_at(place.origin, offset), name);
        }

        let policy = self.options.policy;
        for (index, element) in source.iter().enumerate() {
            let row = data_row(place.origin, index);
            for (position, offset) in bindings.iter() {
                let tag = &tags[position];
                let value = match element.extract(Slot::Field { position, tag }) {
                    Ok(value) => value,
                    Err(err) => {
                        policy.settle(row, tag.column, err, &mut staged.result)?;
                        CellValue::Empty
                    }
                };
                staged.put(row, column_at(place.origin, offset), value);
            }
        }
        Ok(staged)
    }

    /// No header: element `i` fills the row `i` below the origin's row,
    /// starting at the origin itself.
    fn stage_sequences<E: Element>(&self, place: &Target, source: &[E]) -> Result<Staged, Error> {
        let policy = self.options.policy;
        let mut staged = Staged::default();
        staged.result.rows = source.len();
        for (index, element) in source.iter().enumerate() {
            let row = place.origin.row.saturating_add(u32::try_from(index).unwrap_or(u32::MAX));
            let width = element.width();
            for offset in 0..width {
                let column = column_at(place.origin, offset);
                let value = match element.extract(Slot::Index(offset)) {
                    Ok(value) => value,
                    Err(err) => {
                        policy.settle(row, &column_to_letters(column), err, &mut staged.result)?;
                        CellValue::Empty
                    }
                };
                staged.put(row, column, value);
            }
            staged.result.columns = staged.result.columns.max(width);
        }
        Ok(staged)
    }

    /// The header is the sorted union of every element's keys, reusing
    /// header cells that already name a key.
    fn stage_maps<E: Element>(&self, place: &Target, source: &[E]) -> Result<Staged, Error> {
        let keys: BTreeSet<String> = source.iter().flat_map(<E as Element>::keys).collect();
        let header = self.header(place)?;

        let mut next = header.len();
        let columns: Vec<(String, usize)> = keys
            .into_iter()
            .map(|key| {
                let offset = header.iter().position(|cell| *cell == key).unwrap_or_else(|| {
                    next += 1;
                    next - 1
                });
                (key, offset)
            })
            .collect();

        let mut staged = Staged::default();
        staged.result.rows = source.len();
        staged.result.columns = columns.len();
        for (key, offset) in &columns {
            let column = column_at(place.origin, *offset);
            staged.put(place.origin.row, column, CellValue::Text(key.clone()));
        }

        let policy = self.options.policy;
        for (index, element) in source.iter().enumerate() {
            let row = data_row(place.origin, index);
            for (key, offset) in &columns {
                let value = match element.extract(Slot::Key(key)) {
                    Ok(value) => value,
                    Err(err) => {
                        policy.settle(row, key, err, &mut staged.result)?;
                        CellValue::Empty
                    }
                };
                staged.put(row, column_at(place.origin, *offset), value);
            }
        }
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as cellmap;
    use crate::error::ConvertError;
    use crate::options::ConversionPolicy;
    use cellmap_common::FieldTag;
    use cellmap_workbook::MemoryGrid;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    #[derive(Debug, Default, cellmap::Record)]
    struct Line {
        #[sheet("Qty")]
        qty: u32,
        #[sheet("Sku,default:none", write = "SKU")]
        sku: String,
        #[sheet("-")]
        scratch: String,
    }

    #[test]
    fn writes_header_then_one_row_per_element() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        let lines = vec![
            Line { qty: 2, sku: "A-1".into(), scratch: "x".into() },
            Line { qty: 5, sku: String::new(), scratch: String::new() },
        ];
        let result = Writer::new(&mut grid).marshal(&lines).unwrap();
        assert_eq!(result, OperationResult { rows: 2, columns: 2, skipped: 0 });
        assert_eq!(
            grid.sheet_text("Sheet1"),
            vec![
                vec!["Qty".to_string(), "SKU".to_string()],
                vec!["2".to_string(), "A-1".to_string()],
                vec!["5".to_string(), "none".to_string()],
            ]
        );
    }

    #[test]
    fn existing_header_layout_is_kept() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        grid.set_value("Sheet1", 1, 1, "Notes").unwrap();
        grid.set_value("Sheet1", 1, 2, "SKU").unwrap();
        let lines = vec![Line { qty: 1, sku: "B".into(), scratch: String::new() }];
        Writer::new(&mut grid).marshal(&lines).unwrap();
        assert_eq!(grid.get_value("Sheet1", 1, 3), Some(&CellValue::from("Qty")));
        assert_eq!(grid.get_value("Sheet1", 2, 2), Some(&CellValue::from("B")));
        assert_eq!(grid.get_value("Sheet1", 2, 3), Some(&CellValue::Int(1)));
    }

    #[test]
    fn missing_sheet_is_created_on_request() {
        let mut grid = MemoryGrid::new();
        let lines = vec![Line::default()];

        let options = WriteOptions::default().with_sheet("Out");
        let err = Writer::with_options(&mut grid, options.clone()).marshal(&lines).unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigError::SheetNotFound(_))));

        let options = options.create_missing_sheet(true);
        Writer::with_options(&mut grid, options).marshal(&lines).unwrap();
        assert_eq!(grid.sheet_names().unwrap(), vec!["Out".to_string()]);
    }

    #[test]
    fn maps_write_the_sorted_union_of_keys() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        let rows: Vec<HashMap<String, i64>> = vec![
            HashMap::from([("b".to_string(), 2)]),
            HashMap::from([("a".to_string(), 1), ("c".to_string(), 3)]),
        ];
        let result = Writer::new(&mut grid).marshal(&rows).unwrap();
        assert_eq!(result.columns, 3);
        assert_eq!(grid.sheet_text("Sheet1")[0], vec!["a", "b", "c"]);
        assert_eq!(grid.get_value("Sheet1", 2, 1), None);
        assert_eq!(grid.get_value("Sheet1", 3, 3), Some(&CellValue::Int(3)));
    }

    #[test]
    fn sequences_have_no_header() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        let rows = vec![vec![1.5, 2.0], vec![3.0]];
        let result = Writer::new(&mut grid).marshal(&rows).unwrap();
        assert_eq!(result, OperationResult { rows: 2, columns: 2, skipped: 0 });
        assert_eq!(grid.get_value("Sheet1", 1, 1), Some(&CellValue::Number(1.5)));
        assert_eq!(grid.get_value("Sheet1", 2, 1), Some(&CellValue::Number(3.0)));
    }

    #[derive(Debug, Default, cellmap::Record)]
    struct Stamp {
        #[sheet("Name")]
        name: String,
        #[sheet("When")]
        when: NaiveDate,
    }

    fn stamps() -> Vec<Stamp> {
        vec![
            Stamp { name: "a".into(), when: NaiveDate::default() },
            Stamp { name: "b".into(), when: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() },
        ]
    }

    fn bad_layout() -> TagOverrides {
        let mut overrides = TagOverrides::default();
        overrides.insert("when".into(), FieldTag::new().with_format("%Q"));
        overrides
    }

    #[test]
    fn failed_marshal_leaves_the_grid_untouched() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        grid.set_value("Sheet1", 1, 1, "Name").unwrap();
        grid.set_value("Sheet1", 2, 1, "old").unwrap();
        let before = grid.sheet_text("Sheet1");

        let err = Writer::new(&mut grid)
            .marshal_with(&stamps(), &bad_layout())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Conversion { row: 3, ref column, source: ConvertError::Layout { .. } }
                if column == "When"
        ));
        assert_eq!(grid.sheet_text("Sheet1"), before);
    }

    #[test]
    fn failed_marshal_does_not_create_the_sheet() {
        let mut grid = MemoryGrid::new();
        let options = WriteOptions::default().with_sheet("Out").create_missing_sheet(true);
        let mut writer = Writer::with_options(&mut grid, options);
        assert!(writer.marshal_with(&stamps(), &bad_layout()).is_err());
        writer.marshal(&stamps()).unwrap();
        drop(writer);
        assert_eq!(grid.sheet_names().unwrap(), vec!["Out".to_string()]);
        assert_eq!(grid.sheet_text("Out")[2], vec!["b", "2024-01-01"]);
    }

    #[test]
    fn lenient_policy_writes_blank_cells_for_failures() {
        let mut grid = MemoryGrid::with_sheet("Sheet1");
        let options = WriteOptions::default().with_policy(ConversionPolicy::Lenient);
        let result = Writer::with_options(&mut grid, options)
            .marshal_with(&stamps(), &bad_layout())
            .unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(
            grid.sheet_text("Sheet1"),
            vec![vec!["Name", "When"], vec!["a", ""], vec!["b", ""]]
        );
    }
}
