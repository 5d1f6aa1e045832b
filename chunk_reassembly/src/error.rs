use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while reading and reassembling chunks.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ReassemblyError {
    #[error("Duplicate chunk completion at offset {offset}")]
    DuplicateChunk { offset: u64 },

    #[error("Chunk read failed at offset {offset}: {message}")]
    ChunkRead { offset: u64, message: String },

    #[error("Chunk read at offset {offset} exceeded the {timeout:?} deadline")]
    ChunkReadTimeout { offset: u64, timeout: Duration },

    #[error("Reassembly aborted at offset {offset}: {source}")]
    ReassemblyAborted {
        offset: u64,
        #[source]
        source: Box<ReassemblyError>,
    },

    #[error("Invalid chunk (offset {offset}, size {size}): {reason}")]
    InvalidChunk { offset: u64, size: u64, reason: String },

    #[error("Invalid Configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Reassembly was cancelled")]
    Cancelled,

    #[error("IO Error: {0}")]
    IoError(Arc<std::io::Error>),

    #[error("Task Runtime Error: {0}")]
    TaskRuntimeError(String),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ReassemblyError>;

impl From<std::io::Error> for ReassemblyError {
    fn from(err: std::io::Error) -> Self {
        ReassemblyError::IoError(Arc::new(err))
    }
}

impl From<tokio::task::JoinError> for ReassemblyError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReassemblyError::TaskRuntimeError(err.to_string())
    }
}

impl ReassemblyError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ReassemblyError::InternalError(msg.into())
    }

    /// Whether a chunk read that failed with this error may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReassemblyError::ChunkRead { .. } | ReassemblyError::ChunkReadTimeout { .. } => true,
            ReassemblyError::IoError(e) => !matches!(
                e.kind(),
                ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidInput | ErrorKind::Unsupported
            ),
            _ => false,
        }
    }

    /// The offset of the chunk this error refers to, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ReassemblyError::DuplicateChunk { offset }
            | ReassemblyError::ChunkRead { offset, .. }
            | ReassemblyError::ChunkReadTimeout { offset, .. }
            | ReassemblyError::ReassemblyAborted { offset, .. }
            | ReassemblyError::InvalidChunk { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let interrupted: ReassemblyError = std::io::Error::new(ErrorKind::Interrupted, "eintr").into();
        assert!(interrupted.is_retryable());

        let missing: ReassemblyError = std::io::Error::new(ErrorKind::NotFound, "gone").into();
        assert!(!missing.is_retryable());

        let timeout = ReassemblyError::ChunkReadTimeout {
            offset: 0,
            timeout: Duration::from_millis(5),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.offset(), Some(0));

        assert!(!ReassemblyError::DuplicateChunk { offset: 4 }.is_retryable());
        assert!(!ReassemblyError::InvalidConfiguration("chunk_size".to_string()).is_retryable());
    }
}
