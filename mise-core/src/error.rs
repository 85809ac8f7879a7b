use thiserror::Error;
use std::path::PathBuf;

/// The main result type for mise-core operations.
pub type MiseResult<T> = Result<T, MiseError>;

/// Enum representing possible errors within the mise-core library.
///
/// Every variant is raised before any partial result is produced, so a caller
/// receiving an error never observes half-computed output.
#[derive(Error, Debug)]
pub enum MiseError {
    #[error("Unknown embedding space: {0}")]
    UnknownSpace(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid component count: requested {requested}, allowed range is 1..={max}")]
    InvalidComponentCount { requested: usize, max: usize },

    #[error("Invalid cluster count: requested {requested}, allowed range is 1..={max}")]
    InvalidClusterCount { requested: usize, max: usize },

    #[error("Operation is not supported: {0}")]
    UnsupportedOperation(String),

    #[error("Cluster {0} has no members to sample from")]
    EmptyCluster(usize),

    #[error("Embedding space already registered: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error accessing path {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<std::io::Error> for MiseError {
    fn from(err: std::io::Error) -> Self {
        // Conversions via `?` lose the path; loaders attach it explicitly where known.
        MiseError::IoError {
            path: PathBuf::from("<unknown_io_source>"),
            source: err,
        }
    }
}
