use std::path::PathBuf;
use thiserror::Error;

// Unified error type for gauss-jacobi

#[derive(Error, Debug)]
pub enum JError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("invalid CSR matrix: {0}")]
    InvalidMatrix(String),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("zero or missing diagonal entry at row {0}")]
    ZeroDiagonal(usize),
    #[error("partition error: {0}")]
    Partition(String),
    #[error("rank {rank} reported a failure; aborting collectively")]
    PeerFailure { rank: usize },
    #[error("communicator error: {0}")]
    Comm(String),
}

impl JError {
    /// Status code broadcast to peers when this error happens on the root rank.
    ///
    /// Zero is reserved for success.
    pub fn status_code(&self) -> u8 {
        match self {
            JError::Io { .. } => 1,
            JError::Parse { .. } => 2,
            JError::InvalidMatrix(_) => 3,
            JError::DimensionMismatch { .. } => 4,
            JError::ZeroDiagonal(_) => 5,
            JError::Partition(_) => 6,
            JError::PeerFailure { .. } => 7,
            JError::Comm(_) => 8,
        }
    }
}
