//! Foundation types for the AIP storage core.
//!
//! This crate provides the identity and structural types shared by every
//! other `aip-*` crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`Identifier`] -- Opaque archival object identifier (URI, URN, DOI)
//! - [`SafeName`] -- Reversible filesystem-safe encoding of an identifier
//! - [`VersionId`] -- 1-based, zero-padded version ordinal (`v00001`)
//! - [`ErrorKind`] -- Storage error taxonomy shared by all crates
//! - [`CancellationToken`] -- Cooperative cancellation for long operations
//! - [`ProgressObserver`] -- Injectable percent-progress callback

pub mod control;
pub mod error;
pub mod identifier;
pub mod kind;
pub mod version;

pub use control::{CancellationToken, NoopProgress, ProgressObserver};
pub use error::TypeError;
pub use identifier::{Identifier, SafeName};
pub use kind::ErrorKind;
pub use version::VersionId;
