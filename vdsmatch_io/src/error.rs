//! Error types for reading network data and writing results.

use std::path::PathBuf;
use thiserror::Error;
use vdsmatch_core::NetworkError;

/// Errors that can occur while loading inputs or writing outputs.
#[derive(Debug, Error)]
pub enum IoError {
    /// Input file could not be opened
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from an opened input failed
    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),

    /// A data row has the wrong shape or an unparsable field (1-based line)
    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Writing results failed
    #[error("Write error: {0}")]
    Write(#[source] std::io::Error),

    /// The records do not form a consistent network
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl IoError {
    /// Creates an open error for `path`.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-record error.
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}
