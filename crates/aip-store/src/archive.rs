use std::fs;
use std::path::{Path, PathBuf};

use aip_crypto::{verify_file, DigestAlgorithm};
use aip_pack::{unpack_file, ArchiveFormat, ArchiveSource, ArchiveWriter, EntryStream};
use aip_types::{Identifier, VersionId};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::object::StorageObject;
use crate::options::{StoreLayout, StoreOptions, StoreReceipt, StoreSettings};
use crate::pairtree::PairtreeResolver;
use crate::traits::ObjectStore;

/// Object store that packages each version's payload as a single tar
/// named `<safe-name>.tar` (or `.tar.gz`) inside the version directory.
///
/// The inventory tracks the archive file itself; payload files are
/// reached through the archive on retrieval.
#[derive(Clone, Debug)]
pub struct ArchiveObjectStore {
    resolver: PairtreeResolver,
    settings: StoreSettings,
    format: ArchiveFormat,
}

impl ArchiveObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_settings(root, StoreSettings::default(), ArchiveFormat::Tar)
    }

    pub fn with_settings(
        root: impl Into<PathBuf>,
        settings: StoreSettings,
        format: ArchiveFormat,
    ) -> Self {
        Self {
            resolver: PairtreeResolver::new(root),
            settings,
            format,
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// File name of the packaged payload for `id`.
    pub fn archive_name(&self, id: &Identifier) -> String {
        format!("{}.{}", id.safe_name(), self.format.extension())
    }

    /// Locate the committed archive of `version` and check it against the
    /// inventory before anything reads from it.
    fn verified_archive(
        &self,
        object: &StorageObject,
        version: Option<VersionId>,
    ) -> StoreResult<(VersionId, PathBuf)> {
        let inventory = object.load_inventory()?;
        let version = object.resolve_version(&inventory, version)?;
        let entry = inventory
            .version(version)
            .ok_or_else(|| StoreError::VersionNotFound {
                id: object.id().clone(),
                version,
            })?;

        // Any archive the version holds; the format may have changed since.
        let (logical, digest) = entry
            .state
            .iter()
            .flat_map(|(digest, paths)| paths.iter().map(move |p| (p, digest)))
            .find(|(p, _)| ArchiveFormat::from_file_name(p).is_ok())
            .ok_or_else(|| StoreError::EntryNotFound {
                id: object.id().clone(),
                version,
                entry: self.archive_name(object.id()),
            })?;
        let content = inventory.content_path(digest).ok_or_else(|| {
            StoreError::InvalidInput(format!("{version} archive {logical} has no content path"))
        })?;

        let path = object.data_dir().join(content);
        let size = fs::metadata(&path)
            .map_err(|e| StoreError::io(&path, e))?
            .len();
        verify_file(&path, size, digest, DigestAlgorithm::Sha512)?;
        debug!(path = %path.display(), "archive verified");
        Ok((version, path))
    }
}

impl ObjectStore for ArchiveObjectStore {
    fn layout(&self) -> StoreLayout {
        StoreLayout::Archive
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
        if !payload.is_dir() {
            return Err(StoreError::InvalidInput(format!(
                "payload is not a directory: {}",
                payload.display()
            )));
        }
        let staging = tempfile::tempdir().map_err(|e| StoreError::io(std::env::temp_dir(), e))?;
        let archive = staging.path().join(self.archive_name(id));
        let summary = ArchiveWriter::new(payload)
            .with_format(self.format)
            .with_excluded(&self.settings.excluded_names)
            .with_cancellation(options.cancel.clone())
            .finish(&archive)
            .map_err(|e| match e {
                aip_pack::PackError::Cancelled => StoreError::Cancelled,
                other => other.into(),
            })?;
        debug!(%id, files = summary.files, empty_dirs = summary.empty_dirs, "payload packaged");

        let receipt = self
            .object(id)
            .commit(staging.path(), options, &self.settings, &[])?;
        info!(%id, version = %receipt.version, "stored archive payload");
        Ok(receipt)
    }

    fn retrieve(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        dest: &Path,
    ) -> StoreResult<PathBuf> {
        let (version, archive) = self.verified_archive(&self.object(id), version)?;
        let summary = unpack_file(&archive, dest)?;
        info!(%id, %version, files = summary.files, dest = %dest.display(), "retrieved");
        Ok(dest.to_path_buf())
    }

    fn read_entry(
        &self,
        id: &Identifier,
        version: Option<VersionId>,
        entry: &str,
        chunk_size: usize,
    ) -> StoreResult<EntryStream> {
        let (version, archive) = self.verified_archive(&self.object(id), version)?;
        let source = ArchiveSource::file(&archive)?;
        match EntryStream::open_entry(&source, entry, chunk_size) {
            Err(aip_pack::PackError::EntryNotFound(_)) => Err(StoreError::EntryNotFound {
                id: id.clone(),
                version,
                entry: entry.to_string(),
            }),
            other => Ok(other?),
        }
    }
}
