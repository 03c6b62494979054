use std::path::PathBuf;

use aip_crypto::DigestError;
use aip_inventory::InventoryError;
use aip_pack::PackError;
use aip_types::{ErrorKind, Identifier, TypeError, VersionId};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    ObjectNotFound(Identifier),

    #[error("version {version} of {id} not found")]
    VersionNotFound { id: Identifier, version: VersionId },

    #[error("entry {entry:?} not found in {id} {version}")]
    EntryNotFound {
        id: Identifier,
        version: VersionId,
        entry: String,
    },

    /// Another writer holds the object or committed the allocated version.
    #[error("concurrent modification of {id}: {reason}")]
    ConcurrentModification { id: Identifier, reason: String },

    #[error("store cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            Self::VersionNotFound { .. } => ErrorKind::VersionNotFound,
            Self::EntryNotFound { .. } => ErrorKind::EntryNotFound,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Type(e) => e.kind(),
            Self::Digest(e) => e.kind(),
            Self::Pack(e) => e.kind(),
            Self::Inventory(e) => e.kind(),
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
