//! Unmarshal: grid rows into a `Vec` of elements.

use crate::columns::bind_read;
use crate::container::{Element, Layout, Slot};
use crate::error::Error;
use crate::options::{ConversionPolicy, OperationResult, ReadOptions};
use crate::schema::{Schema, TagOverrides};
use crate::session::{LayoutCache, Target};
use cellmap_common::Direction;
use cellmap_common::coord::column_to_letters;
use cellmap_workbook::GridReader;

/// Reads tables out of one grid. Layouts are cached per element type for
/// the lifetime of the reader.
pub struct Reader<'g, G: GridReader> {
    grid: &'g G,
    options: ReadOptions,
    layouts: LayoutCache,
}

impl<'g, G: GridReader> Reader<'g, G> {
    pub fn new(grid: &'g G) -> Self {
        Self::with_options(grid, ReadOptions::default())
    }

    pub fn with_options(grid: &'g G, options: ReadOptions) -> Self {
        Self {
            grid,
            options,
            layouts: LayoutCache::default(),
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn unmarshal<E: Element>(&mut self, target: &mut Vec<E>) -> Result<OperationResult, Error> {
        self.unmarshal_with(target, &TagOverrides::default())
    }

    /// Like [`Reader::unmarshal`], with per-field tags that replace the read
    /// channel of the named fields for this call only. `target` is replaced
    /// when the call succeeds and left untouched otherwise.
    pub fn unmarshal_with<E: Element>(
        &mut self,
        target: &mut Vec<E>,
        overrides: &TagOverrides,
    ) -> Result<OperationResult, Error> {
        let place = Target::resolve(self.grid, &self.options.sheet, &self.options.origin)?;

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "unmarshal",
            element = std::any::type_name::<E>(),
            sheet = %place.sheet,
            origin = %place.origin
        )
        .entered();

        let layout = self.layouts.get::<E>();
        let (elements, result) = match &*layout {
            Layout::Record(schema) => self.read_records(schema, overrides, &place)?,
            Layout::Sequence => self.read_sequences(&place)?,
            Layout::Map => self.read_maps(&place)?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows = result.rows,
            columns = result.columns,
            skipped = result.skipped,
            "unmarshal finished"
        );

        *target = elements;
        Ok(result)
    }

    fn policy(&self) -> ConversionPolicy {
        self.options.policy
    }

    fn read_records<E: Element>(
        &self,
        schema: &Schema,
        overrides: &TagOverrides,
        place: &Target,
    ) -> Result<(Vec<E>, OperationResult), Error> {
        let tags = schema.resolve(Direction::Read, overrides);
        if tags.iter().all(|tag| tag.ignore) {
            return Err(Error::UnsupportedShape {
                element: schema.element(),
                direction: Direction::Read,
            });
        }

        let header = self
            .grid
            .read_row(&place.sheet, place.origin.row, place.origin.col)
            .map_err(Error::grid)?;
        let bindings = bind_read(schema, &tags, &header)?;

        let mut result = OperationResult {
            columns: header.len(),
            ..OperationResult::default()
        };
        let mut elements = Vec::new();

        for row in self.grid.rows(&place.sheet, place.origin.offset(1, 0)) {
            let (row, cells) = row.map_err(Error::grid)?;
            if cells.is_empty() {
                continue;
            }
            let mut element = E::instantiate();
            for (position, offset) in bindings.iter() {
                let tag = &tags[position];
                let text = cells.get(offset).map(String::as_str).unwrap_or("");
                if let Err(err) = element.assign(Slot::Field { position, tag }, text) {
                    self.policy().settle(row, tag.column, err, &mut result)?;
                }
            }
            elements.push(element);
            result.rows += 1;
        }
        Ok((elements, result))
    }

    /// No header: every non-blank row from the origin is one element.
    fn read_sequences<E: Element>(
        &self,
        place: &Target,
    ) -> Result<(Vec<E>, OperationResult), Error> {
        let mut result = OperationResult::default();
        let mut elements = Vec::new();

        for row in self.grid.rows(&place.sheet, place.origin) {
            let (row, cells) = row.map_err(Error::grid)?;
            if cells.is_empty() {
                continue;
            }
            let mut element = E::instantiate();
            for (index, text) in cells.iter().enumerate() {
                if let Err(err) = element.assign(Slot::Index(index), text) {
                    let column = column_to_letters(place.origin.col + index as u32);
                    self.policy().settle(row, &column, err, &mut result)?;
                }
            }
            result.columns = result.columns.max(cells.len());
            elements.push(element);
            result.rows += 1;
        }
        Ok((elements, result))
    }

    /// Header cells are keys; blank header cells and blank data cells are
    /// left out of the map.
    fn read_maps<E: Element>(&self, place: &Target) -> Result<(Vec<E>, OperationResult), Error> {
        let header = self
            .grid
            .read_row(&place.sheet, place.origin.row, place.origin.col)
            .map_err(Error::grid)?;

        let mut result = OperationResult {
            columns: header.len(),
            ..OperationResult::default()
        };
        let mut elements = Vec::new();

        for row in self.grid.rows(&place.sheet, place.origin.offset(1, 0)) {
            let (row, cells) = row.map_err(Error::grid)?;
            if cells.is_empty() {
                continue;
            }
            let mut element = E::instantiate();
            for (key, text) in header.iter().zip(&cells) {
                if key.is_empty() || text.is_empty() {
                    continue;
                }
                if let Err(err) = element.assign(Slot::Key(key), text) {
                    self.policy().settle(row, key, err, &mut result)?;
                }
            }
            elements.push(element);
            result.rows += 1;
        }
        Ok((elements, result))
    }
}
