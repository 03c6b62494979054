use std::path::{Path, PathBuf};

use aip_inventory::{fixity, FixityReport, Inventory};
use aip_pack::EntryStream;
use aip_types::{Identifier, VersionId};

use crate::error::StoreResult;
use crate::listing::{self, ObjectListing};
use crate::object::StorageObject;
use crate::options::{StoreLayout, StoreOptions, StoreReceipt};
use crate::pairtree::PairtreeResolver;

/// Versioned storage of archival objects.
///
/// All implementations must satisfy these invariants:
/// - Versions of an object are numbered 1, 2, 3, ... in commit order and
///   are never rewritten once committed.
/// - The inventory is the last thing a store writes; a failed or
///   cancelled store leaves the previous inventory in place.
/// - A file is verified by size and SHA-512 after it is persisted and
///   again when it is handed back.
/// - At most one writer per object at a time.
pub trait ObjectStore: Send + Sync {
    fn layout(&self) -> StoreLayout;

    /// Resolver for this store's repository root.
    fn resolver(&self) -> &PairtreeResolver;

    /// Persist `payload` as the next version of `id`.
    fn store(
        &self,
        id: &Identifier,
        payload: &Path,
        options: &StoreOptions,
    ) -> StoreResult<StoreReceipt>;

    /// Rebuild the complete payload of `version` (head if `None`) below
    /// `dest` and return `dest`.
    fn retrieve(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        dest: &Path,
    ) -> StoreResult<PathBuf>;

    /// Stream one payload file of `version` (head if `None`) in chunks.
    fn read_entry(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        entry: &str,
        chunk_size: usize,
    ) -> StoreResult<EntryStream>;

    /// Handle on the object for `id`. Nothing is created on disk.
    fn object(&self, id: &Identifier) -> StorageObject {
        StorageObject::new(id.clone(), self.resolver().object_root(id))
    }

    /// `true` if any version directory exists for `id`.
    fn object_exists(&self, id: &Identifier) -> bool {
        self.object(id).ledger().exists()
    }

    /// Committed versions of `id`, ascending.
    fn versions(&self, id: &Identifier) -> StoreResult<Vec<VersionId>> {
        Ok(self.object(id).load_inventory()?.version_ids())
    }

    fn inventory(&self, id: &Identifier) -> StoreResult<Inventory> {
        self.object(id).load_inventory()
    }

    /// Recompute every stored file's digests against the inventory.
    fn verify(&self, id: &Identifier) -> StoreResult<FixityReport> {
        let object = self.object(id);
        let inventory = object.load_inventory()?;
        Ok(fixity::verify_fixity(&inventory, &object.data_dir())?)
    }

    /// Latest version of every object in the repository.
    fn list_latest_versions(&self) -> StoreResult<Vec<ObjectListing>> {
        listing::list_latest_versions(self.resolver())
    }
}
