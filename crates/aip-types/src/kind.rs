use std::fmt;

/// Classification shared by every error type in the storage core.
///
/// Integrity kinds abort the call that raised them and are never retried
/// internally. Absence kinds are ordinary negative results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ObjectNotFound,
    VersionNotFound,
    EntryNotFound,
    ChecksumMismatch,
    SizeMismatch,
    PathTraversal,
    ConcurrentModification,
    InventoryCorrupt,
    Cancelled,
    InvalidInput,
    Io,
}

impl ErrorKind {
    /// Corruption or tampering was detected.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch
                | Self::SizeMismatch
                | Self::PathTraversal
                | Self::InventoryCorrupt
        )
    }

    /// A requested object, version or entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ObjectNotFound | Self::VersionNotFound | Self::EntryNotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
