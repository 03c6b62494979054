use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aip_types::VersionId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Filesystem view of an object's versions: the `vNNNNN` directories
/// below its data directory.
///
/// Allocation is a linear scan for the first unused ordinal. It is only
/// safe while the caller holds the object's lock.
#[derive(Clone, Debug)]
pub struct VersionLedger {
    data_dir: PathBuf,
}

impl VersionLedger {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn version_dir(&self, version: VersionId) -> PathBuf {
        self.data_dir.join(version.to_string())
    }

    /// `true` if at least one version directory exists.
    pub fn exists(&self) -> bool {
        self.versions().map(|v| !v.is_empty()).unwrap_or(false)
    }

    pub fn version_exists(&self, version: VersionId) -> bool {
        self.version_dir(version).is_dir()
    }

    /// First ordinal, counting from 1, with no directory.
    pub fn next_version(&self) -> VersionId {
        let mut candidate = VersionId::FIRST;
        while self.version_exists(candidate) {
            candidate = candidate.next();
        }
        candidate
    }

    /// The version before [`next_version`](Self::next_version), or `None`
    /// for an object without versions.
    pub fn current_version(&self) -> Option<VersionId> {
        self.next_version().prev()
    }

    /// Every version directory present, ascending. Entries that are not
    /// canonical version names are ignored.
    pub fn versions(&self) -> StoreResult<Vec<VersionId>> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.data_dir, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(version) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Create the directory for `version`.
    ///
    /// The directory itself is created non-recursively so that two
    /// writers racing for the same ordinal cannot both succeed; the loser
    /// gets `AlreadyExists`, reported as `Ok(None)`.
    pub fn create_version_dir(&self, version: VersionId) -> StoreResult<Option<PathBuf>> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))?;
        let dir = self.version_dir(version);
        match fs::create_dir(&dir) {
            Ok(()) => {
                debug!(path = %dir.display(), "created version directory");
                Ok(Some(dir))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }
}
