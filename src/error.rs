//! Error types for Home-Station

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Home-Station operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Home-Station
#[derive(Error, Debug)]
pub enum Error {
    /// A single feed or cache line could not be turned into a sample
    #[error("Parse error: {0}")]
    Parse(#[from] ParseFailure),

    /// Cache directory or segment file errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network/transport failure while talking to the sensor or relay
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a line was rejected by the sample parser.
///
/// Always local to one line; callers skip the line and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Blank line, wrong field count, or a value that is not a valid number
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A value carried a unit other than the one expected for its field
    #[error("unit mismatch in {field}: expected `{expected}`, found `{found}`")]
    UnitMismatch {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    /// The timestamp did not match `DD/MM/YYYY HH:MM:SS [(ZONE)]`
    #[error("bad timestamp: {0}")]
    BadTimestamp(String),
}

/// Filesystem-level failures of the cache store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cache directory {path} is unavailable: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("segment {path} is unreadable: {source}")]
    SegmentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("segment {path} is unwritable: {source}")]
    SegmentUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}
