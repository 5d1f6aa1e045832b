use chunk_reassembly::ReassemblyError;
use thiserror::Error;

use crate::digest::DigestAlgo;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Unknown digest algorithm: {0:?}")]
    UnknownAlgorithm(String),

    #[error("Invalid hex digest: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid {algo} digest: expected {expected} bytes, got {actual}")]
    InvalidLength {
        algo: DigestAlgo,
        expected: usize,
        actual: usize,
    },

    #[error("Reassembly Error: {0}")]
    Reassembly(#[from] ReassemblyError),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
