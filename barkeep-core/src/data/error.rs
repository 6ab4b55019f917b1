//! Structured error types for snapshot and series operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from locating, parsing, reading and writing data files.
///
/// Every variant except `UniverseUnavailable` is recoverable at the batch
/// level: the orchestrator skips the interval or file, or records the symbol
/// as problematic, and moves on.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no snapshot files found in {}", .dir.display())]
    NoSnapshotFound { dir: PathBuf },

    #[error("snapshot {} is missing required columns: {}", .path.display(), .missing.join(", "))]
    UnparsableSnapshot {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("{} line {line}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },

    #[error("universe unavailable: {0}")]
    UniverseUnavailable(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
