//! Error types for registry and document operations.
//!
//! One error type covers every failure mode of this crate: I/O,
//! serialization in each supported format, and malformed input documents.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or writing registries and documents.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// CSV parsing or writing failure.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A document parsed but does not have the expected shape.
    #[error("invalid document {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    /// File extension is not one this crate reads or writes.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// All configured registry sources failed.
    #[error("no registry sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;
