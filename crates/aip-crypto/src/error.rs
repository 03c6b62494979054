use std::path::PathBuf;

use aip_types::ErrorKind;

use crate::algorithm::DigestAlgorithm;

/// Errors from digest computation and verification.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The recomputed digest differs from the expected one.
    #[error(
        "{algorithm} mismatch for {}: expected {expected}, computed {computed}",
        path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        algorithm: DigestAlgorithm,
        expected: String,
        computed: String,
    },

    /// Source and target of a transfer differ in length.
    #[error("size mismatch for {}: expected {expected} bytes, found {actual}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DigestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::UnsupportedAlgorithm(_) => ErrorKind::InvalidInput,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Result alias for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
