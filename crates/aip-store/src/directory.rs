use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use aip_crypto::{verify_file, DigestAlgorithm};
use aip_pack::EntryStream;
use aip_types::{Identifier, VersionId};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::options::{StoreLayout, StoreOptions, StoreReceipt, StoreSettings};
use crate::pairtree::PairtreeResolver;
use crate::traits::ObjectStore;

/// Object store that copies payload files into each version directory.
///
/// Files unchanged since an earlier version at the same path are not
/// copied again, so version directories are sparse; retrieval rebuilds
/// the full state from the inventory.
#[derive(Clone, Debug)]
pub struct DirectoryObjectStore {
    resolver: PairtreeResolver,
    settings: StoreSettings,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_settings(root, StoreSettings::default())
    }

    pub fn with_settings(root: impl Into<PathBuf>, settings: StoreSettings) -> Self {
        Self {
            resolver: PairtreeResolver::new(root),
            settings,
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn layout(&self) -> StoreLayout {
        StoreLayout::Directory
    }

    fn resolver(&self) -> &PairtreeResolver {
        &self.resolver
    }

    fn store(
        &self,
        id: &Identifier,
        payload: &Path,
        options: &StoreOptions,
    ) -> StoreResult<StoreReceipt> {
        let receipt = self.object(id).commit(
            payload,
            options,
            &self.settings,
            &self.settings.excluded_names,
        )?;
        info!(
            %id,
            version = %receipt.version,
            added = receipt.added.len(),
            "stored directory payload"
        );
        Ok(receipt)
    }

    fn retrieve(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        dest: &Path,
    ) -> StoreResult<PathBuf> {
        let object = self.object(id);
        let inventory = object.load_inventory()?;
        let version = object.resolve_version(&inventory, version)?;
        let entry = inventory
            .version(version)
            .ok_or_else(|| StoreError::VersionNotFound {
                id: id.clone(),
                version,
            })?;
        let state = inventory.logical_state(version)?;
        let digests: HashMap<&str, &str> = entry
            .state
            .iter()
            .flat_map(|(digest, paths)| paths.iter().map(move |p| (p.as_str(), digest.as_str())))
            .collect();
        let data_dir = object.data_dir();

        fs::create_dir_all(dest).map_err(|e| StoreError::io(dest, e))?;
        for (logical, content) in &state {
            let source = data_dir.join(content);
            let target = dest.join(logical);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            let size = fs::copy(&source, &target).map_err(|e| StoreError::io(&source, e))?;
            let digest = digests.get(logical.as_str()).copied().unwrap_or_default();
            verify_file(&target, size, digest, DigestAlgorithm::Sha512)?;
            debug!(path = %logical, from = %content, "restored");
        }
        info!(%id, %version, files = state.len(), dest = %dest.display(), "retrieved");
        Ok(dest.to_path_buf())
    }

    fn read_entry(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        entry: &str,
        chunk_size: usize,
    ) -> StoreResult<EntryStream> {
        let object = self.object(id);
        let inventory = object.load_inventory()?;
        let version = object.resolve_version(&inventory, version)?;
        let wanted = entry.trim_start_matches("./");
        let state = inventory.logical_state(version)?;
        let content = state.get(wanted).ok_or_else(|| StoreError::EntryNotFound {
            id: id.clone(),
            version,
            entry: entry.to_string(),
        })?;
        Ok(EntryStream::open_file(&object.data_dir().join(content), chunk_size)?)
    }
}
