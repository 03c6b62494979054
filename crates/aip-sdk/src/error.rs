use aip_types::{ErrorKind, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read configuration {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid identifier: {0}")]
    Identifier(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] aip_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Identifier(_) => ErrorKind::InvalidInput,
            Self::Store(e) => e.kind(),
            Self::ConfigIo { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
