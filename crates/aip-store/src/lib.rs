//! Versioned object storage for the AIP storage core.
//!
//! Maps an [`Identifier`](aip_types::Identifier) to a bounded-depth
//! directory, allocates successive versions for it, and persists each
//! version's payload under one of two layouts.
//!
//! # Layout
//!
//! ```text
//! <root>/<2-char fan-out of the safe name>/
//!   .lock
//!   data/
//!     v00001/ ... vNNNNN/
//!     inventory.json
//!     inventory.json.sha512
//!     0=ocfl_object_1.0
//! ```
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait and share the same
//! [`PairtreeResolver`], [`VersionLedger`] and inventory manager:
//!
//! - [`DirectoryObjectStore`] -- copies payload files into the version directory
//! - [`ArchiveObjectStore`] -- packages the payload as one tar per version
//!
//! # Design Rules
//!
//! 1. Versions are append-only; nothing here deletes a committed version.
//! 2. Write-then-commit: content is copied and verified before the
//!    inventory is rewritten.
//! 3. One writer per object at a time, enforced by an advisory lock.
//! 4. Readers take no lock; the inventory is replaced atomically.

pub mod archive;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod listing;
pub mod lock;
pub mod object;
pub mod options;
pub mod pairtree;
pub mod traits;

pub use archive::ArchiveObjectStore;
pub use directory::DirectoryObjectStore;
pub use error::{StoreError, StoreResult};
pub use ledger::VersionLedger;
pub use listing::{list_latest_versions, ObjectListing};
pub use lock::{LockMode, ObjectLock};
pub use object::StorageObject;
pub use options::{StoreLayout, StoreOptions, StoreReceipt, StoreSettings};
pub use pairtree::{fan_out, PairtreeResolver, SEGMENT_WIDTH};
pub use traits::ObjectStore;
