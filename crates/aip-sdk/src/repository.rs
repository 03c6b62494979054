use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aip_inventory::{FixityReport, Inventory};
use aip_pack::EntryStream;
use aip_store::{
    ArchiveObjectStore, DirectoryObjectStore, ObjectListing, ObjectStore, StoreLayout,
    StoreOptions, StoreReceipt,
};
use aip_types::{Identifier, ProgressObserver, VersionId};
use tracing::info;

use crate::config::RepositoryConfig;
use crate::error::SdkResult;

/// High-level repository API over one storage root.
pub struct Repository {
    config: RepositoryConfig,
    store: Box<dyn ObjectStore>,
}

impl Repository {
    /// Open (creating if needed) the repository described by `config`.
    pub fn open(config: RepositoryConfig) -> SdkResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.root)?;
        let settings = config.store_settings();
        let store: Box<dyn ObjectStore> = match config.layout {
            StoreLayout::Directory => {
                Box::new(DirectoryObjectStore::with_settings(&config.root, settings))
            }
            StoreLayout::Archive => Box::new(ArchiveObjectStore::with_settings(
                &config.root,
                settings,
                config.archive_format,
            )),
        };
        info!(root = %config.root.display(), layout = ?config.layout, "repository opened");
        Ok(Self { config, store })
    }

    /// Open a directory-layout repository at `root` with default settings.
    pub fn at(root: impl Into<PathBuf>) -> SdkResult<Self> {
        Self::open(RepositoryConfig::new(root))
    }

    /// Open the repository described by a TOML file.
    pub fn from_config_file(path: &Path) -> SdkResult<Self> {
        Self::open(RepositoryConfig::load(path)?)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn layout(&self) -> StoreLayout {
        self.store.layout()
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    // ---- Writes ----

    /// Store `payload` as the next version of `id` and return that version.
    pub fn store(&self, id: &str, payload: &Path) -> SdkResult<VersionId> {
        Ok(self.store_with(id, payload, &StoreOptions::default())?.version)
    }

    pub fn store_with(
        &self,
        id: &str,
        payload: &Path,
        options: &StoreOptions,
    ) -> SdkResult<StoreReceipt> {
        let id = Identifier::new(id)?;
        Ok(self.store.store(&id, payload, options)?)
    }

    // ---- Reads ----

    /// Rebuild `version` of `id` (head if `None`) below `dest`.
    pub fn retrieve(
        &self,
        id: &str,
        version: Option<VersionId>,
        dest: &Path,
    ) -> SdkResult<PathBuf> {
        let id = Identifier::new(id)?;
        Ok(self.store.retrieve(&id, version, dest)?)
    }

    /// Stream one payload file in chunks of the configured size.
    pub fn read_entry(
        &self,
        id: &str,
        version: Option<VersionId>,
        entry: &str,
    ) -> SdkResult<EntryStream> {
        let id = Identifier::new(id)?;
        Ok(self
            .store
            .read_entry(&id, version, entry, self.config.chunk_size)?)
    }

    /// Like [`read_entry`](Self::read_entry), reporting percent consumed to `observer`.
    pub fn read_entry_with(
        &self,
        id: &str,
        version: Option<VersionId>,
        entry: &str,
        observer: Arc<dyn ProgressObserver>,
    ) -> SdkResult<EntryStream> {
        Ok(self.read_entry(id, version, entry)?.with_observer(observer))
    }

    // ---- Queries ----

    pub fn object_exists(&self, id: &str) -> SdkResult<bool> {
        Ok(self.store.object_exists(&Identifier::new(id)?))
    }

    pub fn versions(&self, id: &str) -> SdkResult<Vec<VersionId>> {
        Ok(self.store.versions(&Identifier::new(id)?)?)
    }

    pub fn inventory(&self, id: &str) -> SdkResult<Inventory> {
        Ok(self.store.inventory(&Identifier::new(id)?)?)
    }

    /// Recompute stored digests of `id` against its inventory.
    pub fn verify(&self, id: &str) -> SdkResult<FixityReport> {
        Ok(self.store.verify(&Identifier::new(id)?)?)
    }

    /// Latest version of every object, sorted by identifier.
    pub fn list_latest_versions(&self) -> SdkResult<Vec<ObjectListing>> {
        Ok(self.store.list_latest_versions()?)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use aip_pack::ArchiveFormat;
    use aip_store::{LockMode, ObjectLock, PairtreeResolver};
    use aip_types::{CancellationToken, ErrorKind};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    struct Fixture {
        tmp: tempfile::TempDir,
        repo: Repository,
    }

    fn fixture(config: impl FnOnce(&mut RepositoryConfig)) -> Fixture {
        init_tracing();
        let tmp = tempfile::tempdir().unwrap();
        let mut c = RepositoryConfig::new(tmp.path().join("repo"));
        config(&mut c);
        let repo = Repository::open(c).unwrap();
        Fixture { tmp, repo }
    }

    impl Fixture {
        fn payload(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
            let dir = self.tmp.path().join(name);
            for (rel, content) in files {
                let path = dir.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            dir
        }

        fn out(&self, name: &str) -> PathBuf {
            self.tmp.path().join("out").join(name)
        }
    }

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    #[test]
    fn store_and_retrieve_two_versions() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"hello")]);
        assert_eq!(fx.repo.store("urn:test:1", &work).unwrap(), VersionId::FIRST);

        fs::write(work.join("a.txt"), b"hello2").unwrap();
        let v2 = fx.repo.store("urn:test:1", &work).unwrap();
        assert_eq!(v2.to_string(), "v00002");

        let first = fx
            .repo
            .retrieve("urn:test:1", Some(VersionId::FIRST), &fx.out("v1"))
            .unwrap();
        assert_eq!(fs::read(first.join("a.txt")).unwrap(), b"hello");
        let head = fx.repo.retrieve("urn:test:1", None, &fx.out("head")).unwrap();
        assert_eq!(fs::read(head.join("a.txt")).unwrap(), b"hello2");
        assert_eq!(fx.repo.versions("urn:test:1").unwrap().len(), 2);
    }

    #[test]
    fn earlier_versions_stay_intact() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[]);
        fs::create_dir_all(&work).unwrap();
        for n in 1..=5u32 {
            fs::write(work.join(format!("f{n}.txt")), format!("file {n}")).unwrap();
            fs::write(work.join("shared.txt"), format!("rev {n}")).unwrap();
            let v = fx.repo.store("urn:test:mono", &work).unwrap();
            assert_eq!(v.ordinal(), n);
        }

        for n in 1..=5u32 {
            let version = VersionId::new(n).unwrap();
            let out = fx
                .repo
                .retrieve("urn:test:mono", Some(version), &fx.out(&n.to_string()))
                .unwrap();
            assert_eq!(fs::read_to_string(out.join("shared.txt")).unwrap(), format!("rev {n}"));
            for k in 1..=5u32 {
                assert_eq!(out.join(format!("f{k}.txt")).exists(), k <= n);
            }
        }
    }

    #[test]
    fn unchanged_store_adds_no_content() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"same"), ("b/c.txt", b"also")]);
        fx.repo.store("urn:test:dedup", &work).unwrap();
        let before = fx.repo.inventory("urn:test:dedup").unwrap();

        let receipt = fx
            .repo
            .store_with("urn:test:dedup", &work, &StoreOptions::default().with_message("again"))
            .unwrap();
        assert!(receipt.added.is_empty());
        assert_eq!(receipt.unchanged, vec!["a.txt", "b/c.txt"]);
        assert_eq!(fs::read_dir(&receipt.path).unwrap().count(), 0);

        let after = fx.repo.inventory("urn:test:dedup").unwrap();
        assert_eq!(after.manifest, before.manifest);
        let v1 = after.version(VersionId::FIRST).unwrap();
        let v2 = after.version(receipt.version).unwrap();
        assert_eq!(v1.state, v2.state);
        assert_eq!(v2.message, "again");
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    #[test]
    fn verify_reports_corrupted_byte() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"hello"), ("b.txt", b"world")]);
        let receipt = fx
            .repo
            .store_with("urn:test:fix", &work, &StoreOptions::default())
            .unwrap();
        assert!(fx.repo.verify("urn:test:fix").unwrap().is_clean());

        let stored = receipt.path.join("b.txt");
        let mut bytes = fs::read(&stored).unwrap();
        bytes[0] ^= 0x01;
        fs::write(&stored, bytes).unwrap();

        let report = fx.repo.verify("urn:test:fix").unwrap();
        assert!(!report.is_clean());
        assert!(report.failures.iter().all(|f| f.content_path == "v00001/b.txt"));
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"a")]);
        let err = fx.repo.store("", &work).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn cancelled_store_commits_nothing() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"a")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = StoreOptions::default().with_cancellation(cancel);
        let err = fx
            .repo
            .store_with("urn:test:cancel", &work, &options)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(!fx.repo.object_exists("urn:test:cancel").unwrap());
    }

    // ------------------------------------------------------------------
    // Archive layout
    // ------------------------------------------------------------------

    #[test]
    fn archive_layout_end_to_end() {
        let fx = fixture(|c| {
            c.layout = StoreLayout::Archive;
            c.archive_format = ArchiveFormat::TarGz;
            c.chunk_size = 512;
        });
        let big = vec![7u8; 1300];
        let work = fx.payload("work", &[("docs/big.bin", big.as_slice()), ("small.txt", b"s")]);
        fs::create_dir_all(work.join("empty")).unwrap();

        assert_eq!(fx.repo.layout(), StoreLayout::Archive);
        fx.repo.store("urn:test:arc", &work).unwrap();
        fs::write(work.join("small.txt"), b"t").unwrap();
        fx.repo.store("urn:test:arc", &work).unwrap();

        let out = fx
            .repo
            .retrieve("urn:test:arc", Some(VersionId::FIRST), &fx.out("arc"))
            .unwrap();
        assert_eq!(fs::read(out.join("small.txt")).unwrap(), b"s");
        assert!(out.join("empty").is_dir());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn ProgressObserver> = Arc::new(move |p: f64| {
            sink.lock().unwrap().push(p);
        });
        let chunks: Vec<Vec<u8>> = fx
            .repo
            .read_entry_with("urn:test:arc", None, "docs/big.bin", observer)
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![512, 512, 276]);
        assert_eq!(chunks.concat(), big);
        assert_eq!(seen.lock().unwrap().last().copied(), Some(100.0));
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    #[test]
    fn lists_latest_version_per_object() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"a")]);
        fx.repo.store("urn:test:b", &work).unwrap();
        fx.repo.store("urn:test:a", &work).unwrap();
        fx.repo.store("urn:test:b", &work).unwrap();

        let listings = fx.repo.list_latest_versions().unwrap();
        let summary: Vec<(String, u32)> = listings
            .iter()
            .map(|l| (l.id.to_string(), l.version.ordinal()))
            .collect();
        assert_eq!(
            summary,
            vec![("urn:test:a".to_string(), 1), ("urn:test:b".to_string(), 2)]
        );
    }

    // ------------------------------------------------------------------
    // Concurrency
    // ------------------------------------------------------------------

    #[test]
    fn concurrent_stores_get_distinct_versions() {
        let fx = fixture(|_| {});
        let payloads: Vec<PathBuf> = (0..4)
            .map(|n| {
                let body = format!("writer {n}");
                fx.payload(&format!("w{n}"), &[("a.txt", body.as_bytes())])
            })
            .collect();

        let repo = &fx.repo;
        let mut versions: Vec<u32> = std::thread::scope(|s| {
            let handles: Vec<_> = payloads
                .iter()
                .map(|p| s.spawn(move || repo.store("urn:test:race", p).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().ordinal())
                .collect()
        });
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2, 3, 4]);
        assert!(fx.repo.verify("urn:test:race").unwrap().is_clean());
    }

    #[test]
    fn readers_never_see_corruption_during_stores() {
        let fx = fixture(|_| {});
        let work = fx.payload("work", &[("a.txt", b"0")]);
        fx.repo.store("urn:test:r", &work).unwrap();

        let repo = &fx.repo;
        let done = AtomicBool::new(false);
        let (reads, failures) = std::thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut reads = 0usize;
                let mut failures = Vec::new();
                loop {
                    match repo.inventory("urn:test:r") {
                        Ok(_) => reads += 1,
                        Err(e) => failures.push(e.to_string()),
                    }
                    if done.load(Ordering::Acquire) {
                        break;
                    }
                }
                (reads, failures)
            });
            for n in 1..=60 {
                fs::write(work.join("a.txt"), n.to_string()).unwrap();
                repo.store("urn:test:r", &work).unwrap();
            }
            done.store(true, Ordering::Release);
            reader.join().unwrap()
        });

        assert!(failures.is_empty(), "reads failed: {failures:?}");
        assert!(reads > 0);
        assert_eq!(fx.repo.versions("urn:test:r").unwrap().len(), 61);
    }

    #[test]
    fn fail_fast_reports_held_lock() {
        let fx = fixture(|c| c.lock_mode = LockMode::FailFast);
        let work = fx.payload("work", &[("a.txt", b"a")]);
        let id = Identifier::new("urn:test:busy").unwrap();
        let root = PairtreeResolver::new(fx.repo.root()).object_root(&id);
        let held = ObjectLock::acquire(&root, LockMode::Blocking).unwrap().unwrap();

        let err = fx.repo.store("urn:test:busy", &work).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrentModification);

        drop(held);
        assert_eq!(fx.repo.store("urn:test:busy", &work).unwrap(), VersionId::FIRST);
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    #[test]
    fn opens_from_toml_file() {
        init_tracing();
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        let path = tmp.path().join("aip.toml");
        fs::write(
            &path,
            format!(
                "root = {:?}\nlayout = \"archive\"\nexcluded_names = [\"skip.me\"]\n",
                root.display().to_string()
            ),
        )
        .unwrap();

        let repo = Repository::from_config_file(&path).unwrap();
        assert_eq!(repo.layout(), StoreLayout::Archive);
        assert!(root.is_dir());

        let work = tmp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("keep.txt"), b"k").unwrap();
        fs::write(work.join("skip.me"), b"s").unwrap();
        repo.store("urn:test:cfg", &work).unwrap();
        let out = repo.retrieve("urn:test:cfg", None, &tmp.path().join("out")).unwrap();
        assert!(out.join("keep.txt").is_file());
        assert!(!out.join("skip.me").exists());
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Repository::from_config_file(&tmp.path().join("none.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
