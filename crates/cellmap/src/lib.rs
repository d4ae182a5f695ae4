//! Tag-driven mapping between spreadsheet rows and typed collections.
//!
//! Derive [`Record`] on a struct, annotate its fields with `#[sheet(..)]`
//! tags, and move whole tables between a cell grid and a `Vec` of that
//! struct:
//!
//! ```
//! use cellmap::{MemoryGrid, Record};
//!
//! #[derive(Debug, Default, PartialEq, Record)]
//! struct User {
//!     #[sheet("ID")]
//!     id: u32,
//!     #[sheet("Name,default:anonymous")]
//!     name: String,
//! }
//!
//! let mut grid = MemoryGrid::with_sheet("Users");
//! grid.set_value("Users", 1, 1, "ID").unwrap();
//! grid.set_value("Users", 1, 2, "Name").unwrap();
//! grid.set_value("Users", 2, 1, "1").unwrap();
//!
//! let mut users: Vec<User> = Vec::new();
//! let result = cellmap::unmarshal(&grid, &mut users).unwrap();
//! assert_eq!(result.rows, 1);
//! assert_eq!(users, vec![User { id: 1, name: "anonymous".into() }]);
//! ```
//!
//! Besides records, `Vec<V>` / `[V; N]` rows (no header) and
//! `HashMap<String, V>` / `BTreeMap<String, V>` rows (header cells are keys)
//! are supported as element types.

extern crate self as cellmap;

pub mod columns;
pub mod container;
pub mod convert;
pub mod error;
pub mod options;
pub mod reader;
pub mod record;
pub mod schema;
mod session;
pub mod writer;

pub use cellmap_macros::Record;

pub use container::{Element, Layout, Slot};
pub use convert::CellCodec;
pub use error::{ConfigError, ConvertError, Error, FieldError};
pub use options::{ConversionPolicy, OperationResult, ReadOptions, SheetSelector, WriteOptions};
pub use reader::Reader;
pub use record::{Codec, FieldDef, ProvideTags, Record};
pub use schema::{DefaultTags, FieldDescriptor, Schema, TagOverrides};
pub use writer::Writer;

pub use cellmap_common::{CellRef, CellValue, Direction, Encoding, FieldTag, ResolvedTag};
#[cfg(feature = "csv")]
pub use cellmap_workbook::CsvAdapter;
pub use cellmap_workbook::{GridReader, GridWriter, IoError, MemoryGrid};

/// Read every row of the grid's first sheet, with the header at `A1`.
pub fn unmarshal<G: GridReader, E: Element>(
    grid: &G,
    target: &mut Vec<E>,
) -> Result<OperationResult, Error> {
    Reader::new(grid).unmarshal(target)
}

pub fn unmarshal_with<G: GridReader, E: Element>(
    grid: &G,
    options: ReadOptions,
    target: &mut Vec<E>,
    overrides: &TagOverrides,
) -> Result<OperationResult, Error> {
    Reader::with_options(grid, options).unmarshal_with(target, overrides)
}

/// Write `source` into the grid's first sheet, header at `A1`.
pub fn marshal<G: GridReader + GridWriter, E: Element>(
    grid: &mut G,
    source: &[E],
) -> Result<OperationResult, Error> {
    Writer::new(grid).marshal(source)
}

pub fn marshal_with<G: GridReader + GridWriter, E: Element>(
    grid: &mut G,
    options: WriteOptions,
    source: &[E],
    overrides: &TagOverrides,
) -> Result<OperationResult, Error> {
    Writer::with_options(grid, options).marshal_with(source, overrides)
}
