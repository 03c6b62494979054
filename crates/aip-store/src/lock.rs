use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Name of the lock file at each object root.
pub const LOCK_FILE: &str = ".lock";

/// What a writer does when the object is already locked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Wait until the current writer finishes.
    #[default]
    Blocking,
    /// Fail at once with `ConcurrentModification`.
    FailFast,
}

/// Exclusive advisory lock on one storage object, released on drop.
#[derive(Debug)]
pub struct ObjectLock {
    file: File,
    path: PathBuf,
}

impl ObjectLock {
    /// Lock the object rooted at `object_root`, creating the root if needed.
    ///
    /// Returns `Ok(None)` in fail-fast mode when another writer holds it.
    pub fn acquire(object_root: &Path, mode: LockMode) -> StoreResult<Option<Self>> {
        fs::create_dir_all(object_root).map_err(|e| StoreError::io(object_root, e))?;
        let path = object_root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        match mode {
            LockMode::Blocking => {
                file.lock_exclusive().map_err(|e| StoreError::io(&path, e))?;
            }
            LockMode::FailFast => match file.try_lock_exclusive() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!(path = %path.display(), "object lock is held");
                    return Ok(None);
                }
                Err(e) => return Err(StoreError::io(&path, e)),
            },
        }
        debug!(path = %path.display(), "object lock acquired");
        Ok(Some(Self { file, path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ObjectLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "unlock failed; released on close");
        }
    }
}
