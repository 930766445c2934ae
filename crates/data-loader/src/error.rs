//! Error types for the data-loader crate.
//!
//! Loading is the only fallible stage of the system: once a `DataIndex`
//! exists every query on it is infallible.

use thiserror::Error;

/// Errors that can occur while loading and parsing the Book-Crossing files
///
/// Malformed individual rows are not errors: they are skipped and counted,
/// the way the dataset has always been consumed. Only problems that make a
/// whole file unusable end up here.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file had no header line at all
    #[error("Empty file: {file}")]
    EmptyFile { file: String },

    /// A column the loader relies on is absent from the header
    #[error("Missing column {column} in {file}")]
    MissingColumn { file: String, column: String },

    /// The CSV reader failed on something other than a single bad record
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
