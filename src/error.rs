use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a file could not be moved into the library
#[derive(Debug, Error)]
pub enum RelocationError {
    #[error("source file does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("destination already exists: {0}")]
    PathCollision(PathBuf),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy of {path} is incomplete: expected {expected} bytes, found {actual}")]
    CopyVerification {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

pub type RelocationResult<T> = Result<T, RelocationError>;
