use std::fs;
use std::path::{Path, PathBuf};

use aip_inventory::{Inventory, InventoryError, InventoryManager, UpdateOptions};
use aip_types::{Identifier, VersionId};
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::ledger::VersionLedger;
use crate::lock::ObjectLock;
use crate::options::{StoreOptions, StoreReceipt, StoreSettings};

/// Name of the directory holding versions and the inventory.
pub const DATA_DIR: &str = "data";

/// One identifier's fan-out root and everything below it.
#[derive(Clone, Debug)]
pub struct StorageObject {
    id: Identifier,
    root: PathBuf,
}

impl StorageObject {
    pub fn new(id: Identifier, root: PathBuf) -> Self {
        Self { id, root }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn ledger(&self) -> VersionLedger {
        VersionLedger::new(self.data_dir())
    }

    pub fn inventory_manager(&self) -> InventoryManager {
        InventoryManager::new(self.data_dir())
    }

    /// The committed inventory; `ObjectNotFound` if there is none.
    pub fn load_inventory(&self) -> StoreResult<Inventory> {
        match self.inventory_manager().load_for(&self.id) {
            Ok(Some(inventory)) => Ok(inventory),
            Ok(None) => Err(StoreError::ObjectNotFound(self.id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// `requested`, checked against the inventory, or the head.
    pub fn resolve_version(
        &self,
        inventory: &Inventory,
        requested: Option<VersionId>,
    ) -> StoreResult<VersionId> {
        match requested {
            Some(version) if inventory.version(version).is_some() => Ok(version),
            Some(version) => Err(StoreError::VersionNotFound {
                id: self.id.clone(),
                version,
            }),
            None => inventory
                .head()
                .ok_or_else(|| StoreError::ObjectNotFound(self.id.clone())),
        }
    }

    /// Commit `working_dir` as the next version.
    ///
    /// Holds the object lock from allocation through the inventory rewrite.
    /// If anything fails before the rewrite, the new version directory is
    /// removed again.
    pub(crate) fn commit(
        &self,
        working_dir: &Path,
        options: &StoreOptions,
        settings: &StoreSettings,
        excluded: &[String],
    ) -> StoreResult<StoreReceipt> {
        if options.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let _lock = ObjectLock::acquire(&self.root, settings.lock_mode)?.ok_or_else(|| {
            StoreError::ConcurrentModification {
                id: self.id.clone(),
                reason: "object is locked by another writer".into(),
            }
        })?;

        let ledger = self.ledger();
        let manager = self.inventory_manager();
        let version = ledger.next_version();
        if let Some(head) = manager.load_for(&self.id)?.and_then(|inv| inv.head()) {
            if head >= version {
                return Err(StoreError::ConcurrentModification {
                    id: self.id.clone(),
                    reason: format!("head {head} is not below allocated {version}"),
                });
            }
        }
        let version_dir = ledger.create_version_dir(version)?.ok_or_else(|| {
            StoreError::ConcurrentModification {
                id: self.id.clone(),
                reason: format!("{version} was created by another writer"),
            }
        })?;
        info!(id = %self.id, %version, "allocated version");

        let update = UpdateOptions {
            message: options
                .message
                .clone()
                .unwrap_or_else(|| settings.default_message.clone()),
            excluded: excluded.to_vec(),
            cancel: options.cancel.clone(),
            progress: options.observer(),
        };
        match manager.update(&self.id, version, working_dir, &update) {
            Ok(outcome) => Ok(StoreReceipt {
                id: self.id.clone(),
                version,
                path: version_dir,
                added: outcome.added,
                removed: outcome.removed,
                unchanged: outcome.unchanged,
            }),
            // The inventory already names this version; keep its content.
            Err(e @ InventoryError::Unverified { .. }) => Err(e.into()),
            Err(InventoryError::Cancelled) => {
                discard(&version_dir);
                Err(StoreError::Cancelled)
            }
            Err(e) => {
                discard(&version_dir);
                Err(e.into())
            }
        }
    }
}

fn discard(version_dir: &Path) {
    match fs::remove_dir_all(version_dir) {
        Ok(()) => warn!(path = %version_dir.display(), "removed uncommitted version"),
        Err(e) => warn!(
            path = %version_dir.display(),
            error = %e,
            "could not remove uncommitted version; left as orphan"
        ),
    }
}
