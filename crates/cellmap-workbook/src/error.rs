use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{backend} backend: {message}")]
    Backend { backend: String, message: String },

    #[error("unsupported {feature}: {context}")]
    Unsupported { feature: String, context: String },

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("sheet already exists: {0}")]
    SheetExists(String),

    #[error("cell coordinates are 1-based, got ({row}, {col})")]
    InvalidCoordinate { row: u32, col: u32 },
}

impl IoError {
    pub fn from_backend(backend: &str, err: impl Display) -> Self {
        IoError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}
