use thiserror::Error;

use crate::kind::ErrorKind;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("invalid safe name {name:?}: {reason}")]
    InvalidSafeName { name: String, reason: String },

    #[error("decoded identifier is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("invalid version id {0:?}: expected 'v' followed by at least five digits")]
    InvalidVersion(String),

    #[error("version ordinal must be at least 1")]
    ZeroVersion,
}

impl TypeError {
    /// Every type error is a malformed input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}
