//! Whole-repository scan for the latest version of every object.
//!
//! This walks every directory below the root, so it is an audit
//! operation, not something to call per request.

use std::path::PathBuf;

use aip_inventory::{InventoryError, InventoryManager};
use aip_types::{Identifier, VersionId};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::StoreResult;
use crate::ledger::VersionLedger;
use crate::object::DATA_DIR;
use crate::pairtree::PairtreeResolver;

/// Latest version of one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectListing {
    pub id: Identifier,
    pub version: VersionId,
    /// Directory of that version.
    pub path: PathBuf,
}

/// Find every object below the resolver's root.
///
/// An object is any directory holding a `data` directory. Its identifier
/// is rebuilt from the fan-out segments; its latest version is the
/// inventory head, or the highest version directory when no inventory
/// was ever written. Unreadable paths and corrupt objects are skipped
/// with a warning. Results are sorted by identifier.
pub fn list_latest_versions(resolver: &PairtreeResolver) -> StoreResult<Vec<ObjectListing>> {
    let mut listings = Vec::new();
    if !resolver.root().is_dir() {
        return Ok(listings);
    }

    let mut walker = WalkDir::new(resolver.root())
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_dir() || entry.file_name() != DATA_DIR {
            continue;
        }
        // Version content never holds object roots.
        walker.skip_current_dir();

        let data_dir = entry.path().to_path_buf();
        let Some(object_root) = data_dir.parent() else { continue };
        let id = match resolver.identifier_from_path(object_root) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    path = %object_root.display(),
                    error = %e,
                    "skipping unrecognized object root"
                );
                continue;
            }
        };

        let head = match InventoryManager::new(&data_dir).load() {
            Ok(inventory) => inventory.head(),
            Err(InventoryError::NotFound { .. }) => VersionLedger::new(&data_dir).current_version(),
            Err(e) => {
                warn!(%id, error = %e, "skipping object with unreadable inventory");
                continue;
            }
        };
        match head {
            Some(version) => listings.push(ObjectListing {
                id,
                version,
                path: data_dir.join(version.to_string()),
            }),
            None => debug!(%id, "object has no versions"),
        }
    }

    listings.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(listings)
}
