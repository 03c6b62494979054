use std::path::PathBuf;

use aip_crypto::DigestError;
use aip_types::{ErrorKind, VersionId};

/// Errors produced by inventory operations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("no inventory at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("version {0} not recorded in inventory")]
    VersionNotFound(VersionId),

    /// Malformed JSON, a failed sidecar check, or a broken internal invariant.
    #[error("inventory at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("digest algorithm changed from sha512 to {found}")]
    AlgorithmChanged { found: String },

    #[error("inventory belongs to {found}, not {expected}")]
    IdentifierMismatch { expected: String, found: String },

    /// Another writer committed `head` at or past the version being written.
    #[error("version {requested} cannot follow head {head}")]
    VersionConflict { head: VersionId, requested: VersionId },

    /// The inventory was rewritten but its digest sidecar was not.
    #[error("inventory written but sidecar {} failed: {source}", path.display())]
    Unverified {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("update cancelled")]
    Cancelled,

    #[error("directory walk failed: {0}")]
    Walk(String),

    #[error("payload path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InventoryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::ObjectNotFound,
            Self::VersionNotFound(_) => ErrorKind::VersionNotFound,
            Self::Corrupt { .. }
            | Self::AlgorithmChanged { .. }
            | Self::IdentifierMismatch { .. } => ErrorKind::InventoryCorrupt,
            Self::VersionConflict { .. } => ErrorKind::ConcurrentModification,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidPath(_) => ErrorKind::InvalidInput,
            Self::Digest(e) => e.kind(),
            Self::Unverified { .. } | Self::Walk(_) | Self::Serialization(_) | Self::Io { .. } => {
                ErrorKind::Io
            }
        }
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
