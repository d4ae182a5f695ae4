pub mod backends;
pub mod error;
pub mod traits;

#[cfg(feature = "csv")]
pub use backends::CsvAdapter;
pub use backends::MemoryGrid;
pub use error::IoError;
pub use traits::{GridReader, GridWriter, RowCursor, SaveDestination};

// Re-export for convenience
pub use cellmap_common::{CellRef, CellValue};
