pub mod coord;
pub mod tag;
pub mod value;

pub use coord::{CellRef, CoordError};
pub use tag::{DEFAULT_SPLIT, Direction, Encoding, FieldTag, ResolvedTag};
pub use value::*;
