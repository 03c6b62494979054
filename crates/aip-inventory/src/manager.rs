use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aip_crypto::{digest_file, digest_reader, verify_file, DigestAlgorithm, FileDigests};
use aip_types::{CancellationToken, Identifier, NoopProgress, ProgressObserver, VersionId};
use chrono::{SubsecRound, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{InventoryError, InventoryResult};
use crate::fixity::{self, FixityReport};
use crate::inventory::{
    Inventory, PathsByDigest, VersionEntry, DECLARATION_BODY, INVENTORY_FILE, OBJECT_DECLARATION,
};

/// Re-reads of an inventory whose sidecar disagrees with it.
const SIDECAR_RETRIES: u32 = 5;
const SIDECAR_RETRY_DELAY: Duration = Duration::from_millis(2);

/// Knobs for [`InventoryManager::update`].
#[derive(Clone)]
pub struct UpdateOptions {
    /// Recorded as the version's `message`.
    pub message: String,
    /// File or directory names never ingested, matched at any depth.
    pub excluded: Vec<String>,
    pub cancel: CancellationToken,
    /// Receives the percentage of payload files processed.
    pub progress: Arc<dyn ProgressObserver>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            message: "ingest".to_string(),
            excluded: Vec::new(),
            cancel: CancellationToken::new(),
            progress: Arc::new(NoopProgress),
        }
    }
}

/// What an update wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub version: Option<VersionId>,
    /// Logical paths whose content was copied into the new version.
    pub added: Vec<String>,
    /// Logical paths of the previous head missing from this version.
    pub removed: Vec<String>,
    /// Logical paths satisfied by content already stored.
    pub unchanged: Vec<String>,
    pub bytes_written: u64,
}

/// Reads and writes one object's inventory and version content.
///
/// `data_dir` holds the version directories, `inventory.json`, its
/// `.sha512` sidecar and the object declaration file.
#[derive(Clone, Debug)]
pub struct InventoryManager {
    data_dir: PathBuf,
}

impl InventoryManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.data_dir.join(INVENTORY_FILE)
    }

    /// `inventory.json.sha512`
    pub fn sidecar_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{INVENTORY_FILE}.{}", DigestAlgorithm::Sha512.name()))
    }

    pub fn version_dir(&self, version: VersionId) -> PathBuf {
        self.data_dir.join(version.to_string())
    }

    pub fn exists(&self) -> bool {
        self.inventory_path().is_file()
    }

    /// Load and validate the inventory, checking it against its sidecar.
    ///
    /// A writer replaces the inventory and then its sidecar, so a reader
    /// can observe one without the other. A mismatch is re-read a few
    /// times before it is reported as corruption.
    pub fn load(&self) -> InventoryResult<Inventory> {
        let path = self.inventory_path();
        let mut delay = SIDECAR_RETRY_DELAY;
        for attempt in 0..=SIDECAR_RETRIES {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(InventoryError::NotFound { path })
                }
                Err(e) => return Err(InventoryError::io(&path, e)),
            };
            if self.sidecar_matches(&bytes)? {
                return Inventory::from_json_slice(&bytes, &path);
            }
            if attempt < SIDECAR_RETRIES {
                debug!(path = %path.display(), attempt, "inventory and sidecar disagree");
                thread::sleep(delay);
                delay *= 2;
            }
        }
        Err(InventoryError::corrupt(path, "digest does not match sidecar"))
    }

    /// Load the inventory of `id`, or `None` if the object has none yet.
    pub fn load_for(&self, id: &Identifier) -> InventoryResult<Option<Inventory>> {
        let inventory = match self.load() {
            Ok(inventory) => inventory,
            Err(InventoryError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if &inventory.id != id {
            return Err(InventoryError::IdentifierMismatch {
                expected: id.to_string(),
                found: inventory.id.to_string(),
            });
        }
        Ok(Some(inventory))
    }

    /// `true` if `bytes` match the sidecar digest, or there is no sidecar.
    fn sidecar_matches(&self, bytes: &[u8]) -> InventoryResult<bool> {
        let sidecar = self.sidecar_path();
        let recorded = match fs::read_to_string(&sidecar) {
            Ok(recorded) => recorded,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %sidecar.display(), "inventory has no digest sidecar");
                return Ok(true);
            }
            Err(e) => return Err(InventoryError::io(&sidecar, e)),
        };
        let expected = recorded.split_whitespace().next().unwrap_or_default();
        let computed = sha512_of(bytes, &sidecar)?;
        Ok(computed.eq_ignore_ascii_case(expected))
    }

    /// Rewrite the inventory and then its digest sidecar, each replaced
    /// atomically, after making sure the object declaration exists.
    ///
    /// A failed sidecar write is reported as [`InventoryError::Unverified`]
    /// after the inventory itself has been replaced. The old sidecar is
    /// then removed so later loads only warn about the missing digest.
    pub fn write(&self, inventory: &Inventory) -> InventoryResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| InventoryError::io(&self.data_dir, e))?;
        let bytes = inventory.to_json_vec()?;
        let path = self.inventory_path();
        let digest = sha512_of(&bytes, &path)?;

        let declaration = self.data_dir.join(OBJECT_DECLARATION);
        if !declaration.is_file() {
            replace_file(&self.data_dir, &declaration, DECLARATION_BODY.as_bytes())
                .map_err(|e| InventoryError::io(&declaration, e))?;
        }

        replace_file(&self.data_dir, &path, &bytes).map_err(|e| InventoryError::io(&path, e))?;
        self.write_sidecar(&digest)?;

        info!(id = %inventory.id, head = ?inventory.head, "inventory written");
        Ok(())
    }

    fn write_sidecar(&self, digest: &str) -> InventoryResult<()> {
        let sidecar = self.sidecar_path();
        let body = format!("{digest} {INVENTORY_FILE}");
        if let Err(source) = replace_file(&self.data_dir, &sidecar, body.as_bytes()) {
            self.discard_sidecar();
            return Err(InventoryError::Unverified { path: sidecar, source });
        }
        Ok(())
    }

    /// Drop a sidecar that no longer describes the inventory.
    fn discard_sidecar(&self) {
        let sidecar = self.sidecar_path();
        match fs::remove_file(&sidecar) {
            Ok(()) => warn!(path = %sidecar.display(), "removed stale inventory sidecar"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %sidecar.display(),
                error = %e,
                "stale inventory sidecar left in place; delete it to recover"
            ),
        }
    }

    /// Ingest `working_dir` as `version` of `id`.
    ///
    /// A payload file is unchanged, and neither copied nor added to the
    /// manifest, iff some earlier version holds the same logical path with
    /// the same SHA-512. Everything else is copied into the version
    /// directory and verified by size and digest against the working copy.
    /// The inventory is rewritten only after every file is in place.
    pub fn update(
        &self,
        id: &Identifier,
        version: VersionId,
        working_dir: &Path,
        options: &UpdateOptions,
    ) -> InventoryResult<UpdateOutcome> {
        let mut inventory = self
            .load_for(id)?
            .unwrap_or_else(|| Inventory::new(id.clone()));
        if let Some(head) = inventory.head {
            if head >= version {
                return Err(InventoryError::VersionConflict {
                    head,
                    requested: version,
                });
            }
        }

        let version_dir = self.version_dir(version);
        fs::create_dir_all(&version_dir).map_err(|e| InventoryError::io(&version_dir, e))?;

        let payload = collect_payload(working_dir, &options.excluded, &options.cancel)?;
        let total = payload.len();
        let mut outcome = UpdateOutcome {
            version: Some(version),
            ..UpdateOutcome::default()
        };
        let mut state = PathsByDigest::new();

        for (index, (logical, source)) in payload.iter().enumerate() {
            if options.cancel.is_cancelled() {
                return Err(InventoryError::Cancelled);
            }
            let digests = digest_file(source, &[DigestAlgorithm::Sha512, DigestAlgorithm::Md5])?;
            let sha512 = digests.get(DigestAlgorithm::Sha512).unwrap_or_default().to_string();

            if inventory.has_path_with_digest(logical, &sha512) {
                debug!(path = %logical, "unchanged, not copied");
                outcome.unchanged.push(logical.clone());
            } else {
                self.copy_verified(source, &version_dir, logical, &digests, &sha512)?;
                let content_path = format!("{version}/{logical}");
                inventory.add_manifest_path(&sha512, &content_path);
                if let Some(md5) = digests.get(DigestAlgorithm::Md5) {
                    inventory.add_fixity(DigestAlgorithm::Md5, md5, &content_path);
                }
                outcome.added.push(logical.clone());
                outcome.bytes_written += digests.size;
            }

            let paths = state.entry(sha512).or_default();
            if !paths.contains(logical) {
                paths.push(logical.clone());
            }
            options
                .progress
                .on_progress((index + 1) as f64 * 100.0 / total as f64);
        }
        if total == 0 {
            options.progress.on_progress(100.0);
        }

        let current: BTreeSet<&str> = payload.iter().map(|(l, _)| l.as_str()).collect();
        if let Some(previous) = inventory.head.and_then(|h| inventory.version(h)) {
            outcome.removed = previous
                .paths()
                .into_iter()
                .filter(|p| !current.contains(p))
                .map(str::to_string)
                .collect();
        }

        if options.cancel.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }

        inventory.versions.insert(
            version,
            VersionEntry {
                created: Utc::now().trunc_subsecs(0),
                message: options.message.clone(),
                state,
                added: outcome.added.clone(),
                removed: outcome.removed.clone(),
            },
        );
        inventory.head = Some(version);
        self.write(&inventory)?;

        info!(
            id = %id,
            %version,
            added = outcome.added.len(),
            unchanged = outcome.unchanged.len(),
            removed = outcome.removed.len(),
            "version committed"
        );
        Ok(outcome)
    }

    fn copy_verified(
        &self,
        source: &Path,
        version_dir: &Path,
        logical: &str,
        digests: &FileDigests,
        sha512: &str,
    ) -> InventoryResult<()> {
        let target = version_dir.join(logical);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| InventoryError::io(parent, e))?;
        }
        fs::copy(source, &target).map_err(|e| InventoryError::io(&target, e))?;
        verify_file(&target, digests.size, sha512, DigestAlgorithm::Sha512)?;
        debug!(path = %logical, bytes = digests.size, "copied");
        Ok(())
    }

    /// Load the inventory and audit every stored file.
    pub fn verify_fixity(&self) -> InventoryResult<FixityReport> {
        let inventory = self.load()?;
        fixity::verify_fixity(&inventory, &self.data_dir)
    }
}

/// Write `bytes` to a temp file in `dir` and rename it over `target`.
fn replace_file(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn sha512_of(bytes: &[u8], path: &Path) -> InventoryResult<String> {
    let digests = digest_reader(bytes, &[DigestAlgorithm::Sha512])
        .map_err(|e| InventoryError::io(path, e))?;
    Ok(digests
        .get(DigestAlgorithm::Sha512)
        .unwrap_or_default()
        .to_string())
}

/// Regular files below `root` as (logical POSIX path, absolute path),
/// sorted by logical path.
fn collect_payload(
    root: &Path,
    excluded: &[String],
    cancel: &CancellationToken,
) -> InventoryResult<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        return Err(InventoryError::io(
            root,
            io::Error::new(io::ErrorKind::NotFound, "payload directory does not exist"),
        ));
    }
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map_or(true, |name| !excluded.iter().any(|x| x == name))
        });

    let mut files = Vec::new();
    for entry in walker {
        if cancel.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }
        let entry = entry.map_err(|e| InventoryError::Walk(e.to_string()))?;
        if !entry.file_type().is_file() {
            if !entry.file_type().is_dir() {
                debug!(path = %entry.path().display(), "skipping non-regular file");
            }
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| InventoryError::InvalidPath(entry.path().to_path_buf()))?;
        files.push((logical_path(rel)?, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn logical_path(rel: &Path) -> InventoryResult<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| InventoryError::InvalidPath(rel.to_path_buf()))?,
            ),
            _ => return Err(InventoryError::InvalidPath(rel.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aip_types::ErrorKind;
    use std::sync::Mutex;

    struct Fixture {
        _tmp: tempfile::TempDir,
        work: PathBuf,
        manager: InventoryManager,
        id: Identifier,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let manager = InventoryManager::new(tmp.path().join("object/data"));
        Fixture {
            work,
            manager,
            id: Identifier::new("urn:test:1").unwrap(),
            _tmp: tmp,
        }
    }

    fn v(n: u32) -> VersionId {
        VersionId::new(n).unwrap()
    }

    impl Fixture {
        fn put(&self, rel: &str, content: &[u8]) {
            let path = self.work.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn commit(&self, n: u32) -> UpdateOutcome {
            self.manager
                .update(&self.id, v(n), &self.work, &UpdateOptions::default())
                .unwrap()
        }
    }

    // -----------------------------------------------------------------------
    // First version
    // -----------------------------------------------------------------------

    #[test]
    fn first_update_writes_content_and_ledger() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.put("dir/b.txt", b"world");

        let outcome = fx.commit(1);
        assert_eq!(outcome.added, vec!["a.txt", "dir/b.txt"]);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.bytes_written, 10);

        let data = fx.manager.data_dir();
        assert_eq!(fs::read(data.join("v00001/dir/b.txt")).unwrap(), b"world");
        assert_eq!(fs::read_to_string(data.join(OBJECT_DECLARATION)).unwrap(), "ocfl_object_1.0");

        let inv = fx.manager.load().unwrap();
        assert_eq!(inv.head, Some(v(1)));
        let sha = aip_crypto::sha512_file(&fx.work.join("a.txt")).unwrap();
        assert_eq!(inv.manifest[&sha], vec!["v00001/a.txt"]);
        let md5 = aip_crypto::md5_file(&fx.work.join("a.txt")).unwrap();
        assert_eq!(inv.fixity_of(DigestAlgorithm::Md5, "v00001/a.txt"), Some(md5.as_str()));
        assert_eq!(inv.version(v(1)).unwrap().message, "ingest");
    }

    #[test]
    fn sidecar_holds_inventory_digest() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.commit(1);

        let sidecar = fs::read_to_string(fx.manager.sidecar_path()).unwrap();
        let digest = aip_crypto::sha512_file(&fx.manager.inventory_path()).unwrap();
        assert_eq!(sidecar, format!("{digest} inventory.json"));
        assert!(fx.manager.sidecar_path().ends_with("inventory.json.sha512"));
    }

    #[test]
    fn inventory_uses_four_space_indent() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.commit(1);
        let text = fs::read_to_string(fx.manager.inventory_path()).unwrap();
        assert!(text.starts_with(
            "{\n    \"digestAlgorithm\": \"sha512\",\n    \"id\": \"urn:test:1\""
        ));
    }

    // -----------------------------------------------------------------------
    // Deduplication
    // -----------------------------------------------------------------------

    #[test]
    fn identical_content_at_same_path_is_not_copied() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.commit(1);
        let before = fx.manager.load().unwrap().manifest;

        let outcome = fx.commit(2);
        assert!(outcome.added.is_empty());
        assert_eq!(outcome.unchanged, vec!["a.txt"]);
        assert!(!fx.manager.version_dir(v(2)).join("a.txt").exists());

        let inv = fx.manager.load().unwrap();
        assert_eq!(inv.manifest, before);
        let sha = aip_crypto::sha512_file(&fx.work.join("a.txt")).unwrap();
        assert_eq!(inv.version(v(2)).unwrap().digest_of("a.txt"), Some(sha.as_str()));
        assert_eq!(inv.logical_state(v(2)).unwrap()["a.txt"], "v00001/a.txt");
    }

    #[test]
    fn moved_file_is_copied_again() {
        let fx = fixture();
        fx.put("a.txt", b"same");
        fx.commit(1);
        fs::rename(fx.work.join("a.txt"), fx.work.join("b.txt")).unwrap();

        let outcome = fx.commit(2);
        assert_eq!(outcome.added, vec!["b.txt"]);
        assert_eq!(outcome.removed, vec!["a.txt"]);
        let inv = fx.manager.load().unwrap();
        let sha = aip_crypto::sha512_file(&fx.work.join("b.txt")).unwrap();
        assert_eq!(inv.manifest[&sha], vec!["v00001/a.txt", "v00002/b.txt"]);
    }

    #[test]
    fn reverted_content_matches_older_version() {
        let fx = fixture();
        fx.put("a.txt", b"one");
        fx.commit(1);
        fx.put("a.txt", b"two");
        assert_eq!(fx.commit(2).added, vec!["a.txt"]);
        fx.put("a.txt", b"one");
        let outcome = fx.commit(3);
        assert!(outcome.added.is_empty());
        assert_eq!(
            fx.manager.load().unwrap().logical_state(v(3)).unwrap()["a.txt"],
            "v00001/a.txt"
        );
    }

    #[test]
    fn excluded_names_are_ignored() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.put("skip.me", b"s");
        fx.put("tmp/inner.txt", b"i");
        let options = UpdateOptions {
            excluded: vec!["skip.me".into(), "tmp".into()],
            ..UpdateOptions::default()
        };
        let outcome = fx.manager.update(&fx.id, v(1), &fx.work, &options).unwrap();
        assert_eq!(outcome.added, vec!["a.txt"]);
    }

    // -----------------------------------------------------------------------
    // Failure paths
    // -----------------------------------------------------------------------

    #[test]
    fn stale_version_is_a_conflict() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let err = fx
            .manager
            .update(&fx.id, v(1), &fx.work, &UpdateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
    }

    #[test]
    fn cancelled_update_leaves_inventory_untouched() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let before = fs::read(fx.manager.inventory_path()).unwrap();

        fx.put("b.txt", b"b");
        let options = UpdateOptions::default();
        options.cancel.cancel();
        let err = fx.manager.update(&fx.id, v(2), &fx.work, &options).unwrap_err();
        assert!(matches!(err, InventoryError::Cancelled));
        assert_eq!(fs::read(fx.manager.inventory_path()).unwrap(), before);
    }

    #[test]
    fn tampered_inventory_fails_sidecar_check() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let path = fx.manager.inventory_path();
        let text = fs::read_to_string(&path).unwrap().replace("\"ingest\"", "\"edited\"");
        fs::write(&path, text).unwrap();

        let err = fx.manager.load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InventoryCorrupt);
    }

    #[test]
    fn failed_sidecar_write_is_unverified() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let sidecar = fx.manager.sidecar_path();
        fs::remove_file(&sidecar).unwrap();
        fs::create_dir_all(sidecar.join("blocker")).unwrap();

        fx.put("a.txt", b"b");
        let err = fx
            .manager
            .update(&fx.id, v(2), &fx.work, &UpdateOptions::default())
            .unwrap_err();
        assert!(matches!(err, InventoryError::Unverified { .. }));

        fs::remove_dir_all(&sidecar).unwrap();
        assert_eq!(fx.manager.load().unwrap().head(), Some(v(2)));
    }

    #[test]
    fn discarded_stale_sidecar_unblocks_loads() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let stale = fs::read(fx.manager.sidecar_path()).unwrap();
        fx.put("a.txt", b"b");
        fx.commit(2);
        fs::write(fx.manager.sidecar_path(), stale).unwrap();
        assert_eq!(fx.manager.load().unwrap_err().kind(), ErrorKind::InventoryCorrupt);

        fx.manager.discard_sidecar();
        assert!(!fx.manager.sidecar_path().exists());
        assert_eq!(fx.manager.load().unwrap().head(), Some(v(2)));
        fx.put("a.txt", b"c");
        assert_eq!(fx.commit(3).version, Some(v(3)));
    }

    #[test]
    fn foreign_inventory_is_rejected() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.commit(1);
        let other = Identifier::new("urn:test:2").unwrap();
        let err = fx.manager.load_for(&other).unwrap_err();
        assert!(matches!(err, InventoryError::IdentifierMismatch { .. }));
    }

    #[test]
    fn missing_inventory_is_not_found() {
        let fx = fixture();
        assert_eq!(fx.manager.load().unwrap_err().kind(), ErrorKind::ObjectNotFound);
        assert!(fx.manager.load_for(&fx.id).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Fixity and progress
    // -----------------------------------------------------------------------

    #[test]
    fn corrupted_byte_is_reported() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.put("b.txt", b"intact");
        fx.commit(1);
        assert!(fx.manager.verify_fixity().unwrap().is_clean());

        let stored = fx.manager.version_dir(v(1)).join("a.txt");
        let mut bytes = fs::read(&stored).unwrap();
        bytes[0] ^= 0x01;
        fs::write(&stored, bytes).unwrap();

        let report = fx.manager.verify_fixity().unwrap();
        assert_eq!(report.checked, 2);
        let algorithms: Vec<_> = report.failures.iter().map(|f| f.algorithm).collect();
        assert_eq!(algorithms, vec![DigestAlgorithm::Sha512, DigestAlgorithm::Md5]);
        assert!(report.failures.iter().all(|f| f.content_path == "v00001/a.txt"));
    }

    #[test]
    fn missing_content_is_reported() {
        let fx = fixture();
        fx.put("a.txt", b"hello");
        fx.commit(1);
        fs::remove_file(fx.manager.version_dir(v(1)).join("a.txt")).unwrap();
        let report = fx.manager.verify_fixity().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].computed, None);
    }

    #[test]
    fn progress_counts_files() {
        let fx = fixture();
        fx.put("a.txt", b"a");
        fx.put("b.txt", b"b");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = UpdateOptions {
            progress: Arc::new(move |p: f64| sink.lock().unwrap().push(p)),
            ..UpdateOptions::default()
        };
        fx.manager.update(&fx.id, v(1), &fx.work, &options).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    }
}
