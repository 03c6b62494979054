//! High-level SDK for the AIP storage core.
//!
//! [`Repository`] is the entry point for applications that archive
//! payload directories: it stores them as successive versions of an
//! identifier, hands any version back intact, streams single files, and
//! audits stored content against the recorded digests.

pub mod config;
pub mod error;
pub mod repository;

pub use config::{RepositoryConfig, MIN_CHUNK_SIZE};
pub use error::{SdkError, SdkResult};
pub use repository::Repository;

// Re-export key types
pub use aip_inventory::{FixityFailure, FixityReport, Inventory, VersionEntry};
pub use aip_pack::{ArchiveFormat, EntryStream};
pub use aip_store::{LockMode, ObjectListing, StoreLayout, StoreOptions, StoreReceipt};
pub use aip_types::{
    CancellationToken, ErrorKind, Identifier, ProgressObserver, SafeName, VersionId,
};
