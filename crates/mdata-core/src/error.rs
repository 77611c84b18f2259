//! Error types for mdata-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mdata-core
///
/// Malformed input lines are never errors; they are kept as pending lines.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the merged output (or a report)
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A line shape pattern failed to compile
    #[error("invalid line pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Unrecognized line shape name
    #[error("unknown line shape '{0}' (expected 'pv' or 'str-array')")]
    UnknownShape(String),

    /// Scanning found nothing to merge
    #[error("no input files found under {0:?}")]
    NoInputFiles(Vec<PathBuf>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
