use aip_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    /// An archive member would land outside the extraction root.
    #[error("archive member escapes extraction root: {member}")]
    PathTraversal { member: String },

    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("entry is not a regular file: {0}")]
    NotAFile(String),

    #[error("path cannot be stored in an archive: {0}")]
    InvalidPath(String),

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("directory walk failed: {0}")]
    Walk(String),

    #[error("packaging cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::EntryNotFound(_) => ErrorKind::EntryNotFound,
            Self::NotAFile(_)
            | Self::InvalidPath(_)
            | Self::UnsupportedFormat(_)
            | Self::InvalidChunkSize => {
                ErrorKind::InvalidInput
            }
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Walk(_) | Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type PackResult<T> = Result<T, PackError>;
