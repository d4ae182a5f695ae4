use cellmap_common::{CoordError, Direction};
use std::fmt::Display;
use thiserror::Error;

/// Failures of a whole unmarshal/marshal call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("required column `{column}` (field `{field}`) is missing from the header row")]
    RequiredColumnMissing { field: String, column: String },

    #[error("row {row}, column `{column}`: {source}")]
    Conversion {
        row: u32,
        column: String,
        #[source]
        source: ConvertError,
    },

    #[error("row {row}, {target}: {source}")]
    Container {
        row: u32,
        target: String,
        #[source]
        source: FieldError,
    },

    #[error("`{element}` has no fields to {direction}")]
    UnsupportedShape {
        element: &'static str,
        direction: Direction,
    },

    #[error("grid: {0}")]
    Grid(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn grid<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Error::Grid(Box::new(err))
    }

    /// Attach row/column context to a failure raised by an element.
    pub(crate) fn at(row: u32, target: impl Into<String>, err: FieldError) -> Self {
        match err {
            FieldError::Convert(source) => Error::Conversion {
                row,
                column: target.into(),
                source,
            },
            source => Error::Container {
                row,
                target: target.into(),
                source,
            },
        }
    }
}

/// Session settings that cannot be honoured against the given grid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sheet `{0}` does not exist")]
    SheetNotFound(String),

    #[error("sheet index {index} is out of range ({count} sheets)")]
    SheetIndexOutOfRange { index: usize, count: usize },

    #[error("the grid has no sheets")]
    NoSheets,

    #[error("origin `{origin}` is not a valid cell reference: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: CoordError,
    },
}

/// A single value that could not be converted between cell text and its
/// destination type.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read `{text}` as {target}: {reason}")]
    Parse {
        text: String,
        target: &'static str,
        reason: String,
    },

    #[error("default `{default}` is not a valid {target}: {source}")]
    Default {
        default: String,
        target: &'static str,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("`{format}` is not a valid time layout")]
    Layout { format: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{target} has no json codec; mark the field #[sheet(json)]")]
    JsonUnsupported { target: &'static str },

    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    pub fn parse<T: ?Sized>(text: &str, reason: impl Display) -> Self {
        ConvertError::Parse {
            text: text.to_string(),
            target: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(message: impl Display) -> Self {
        ConvertError::Custom(message.to_string())
    }
}

/// Failure to place a value into, or take it out of, one slot of an element.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("no field at position {0}")]
    OutOfRange(usize),

    #[error("index {index} is outside a fixed-size sequence of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{slot} cannot address a {shape} element")]
    SlotMismatch { slot: String, shape: &'static str },

    #[error(transparent)]
    Convert(#[from] ConvertError),
}
