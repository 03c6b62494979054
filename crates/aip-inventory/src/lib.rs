//! Inventory ledger for the AIP storage core.
//!
//! Every storage object keeps one `inventory.json` next to its version
//! directories. It records:
//! - the digest algorithm (SHA-512, fixed for the object's lifetime)
//! - `head`, the highest committed version
//! - the manifest: content digest to every version-qualified path holding it
//! - MD5 fixity for the same paths
//! - per version: creation time, message, logical state, added and removed paths
//!
//! The manifest and fixity maps are append-only. The inventory is rewritten
//! wholesale as the last step of a successful update, so it is the
//! durability boundary: a crash before the rewrite leaves only orphaned
//! files.

pub mod error;
pub mod fixity;
pub mod inventory;
pub mod manager;

pub use error::{InventoryError, InventoryResult};
pub use fixity::{FixityFailure, FixityReport};
pub use inventory::{
    Inventory, PathsByDigest, VersionEntry, DECLARATION_BODY, INVENTORY_FILE, INVENTORY_TYPE,
    OBJECT_DECLARATION,
};
pub use manager::{InventoryManager, UpdateOptions, UpdateOutcome};
