//! Error types for tree construction and serving

use thiserror::Error;

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration, reported before any work.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error outside the per-file recovery path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Build completed no inputs successfully.
    #[error("no usable input: {0}")]
    NoInput(String),
}

/// Per-line parse failure. These are logged with their line number and the
/// offending line is skipped; they never abort a build.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Line did not split into enough tab-separated fields.
    #[error("expected at least {expected} tab-separated fields, found {found}")]
    FieldCount {
        /// Minimum fields a record must carry.
        expected: usize,
        /// Fields present on the offending line.
        found: usize,
    },

    /// Path field was not valid base64.
    #[error("invalid base64 path: {0}")]
    PathEncoding(#[from] base64::DecodeError),

    /// Decoded path bytes were not UTF-8.
    #[error("path is not valid UTF-8")]
    PathUtf8(#[from] std::string::FromUtf8Error),

    /// A numeric field failed to parse.
    #[error("invalid {field} field {value:?}")]
    NumericField {
        /// Which field failed.
        field: &'static str,
        /// The raw token.
        value: String,
    },

    /// File-type field was not a single character.
    #[error("invalid file type field {0:?}")]
    FileType(String),
}

/// Result alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
