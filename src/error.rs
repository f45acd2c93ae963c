//! Error types shared by the indexer, the stream reader and the transforms.

use std::io;
use thiserror::Error;

/// Errors that can occur while locating, decoding or transforming matrix data.
#[derive(Error, Debug)]
pub enum PxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A single cell token could not be parsed as a number or a missing-value symbol.
    #[error("Invalid data token: {0:?}")]
    InvalidToken(String),

    #[error("Format error at data row {row}, column {col}: {message}")]
    Format {
        row: usize,
        col: usize,
        message: String,
    },

    #[error("Keyword '{0}' not found in stream")]
    KeywordNotFound(String),

    #[error("Requested cells out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid read request: {0}")]
    InvalidRequest(String),

    #[error("Dimension '{0}' does not exist in the source")]
    UnknownDimension(String),

    #[error("Value '{value}' does not exist in dimension '{dimension}'")]
    UnknownValue { dimension: String, value: String },

    #[error("Dimension '{0}' is not addressed by the selection")]
    MissingDimension(String),

    #[error("Dimension '{0}' is listed more than once")]
    DuplicateDimension(String),

    #[error("Value '{value}' already exists in dimension '{dimension}'")]
    DuplicateValue { dimension: String, value: String },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// The operation was abandoned through a [`crate::cancel::CancellationToken`].
    #[error("Operation cancelled")]
    Cancelled,

    /// The reader failed or was cancelled earlier and its cursor can no longer be trusted.
    #[error("Reader is unusable after a previous failure")]
    ReaderPoisoned,

    #[error("Worker thread failed: {0}")]
    Join(String),
}

impl PxError {
    /// True if this error signals cancellation rather than a bad request or bad data.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PxError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, PxError>;
