use std::fs;
use std::path::{Path, PathBuf};

use aip_pack::{ArchiveFormat, DEFAULT_CHUNK_SIZE};
use aip_store::{LockMode, StoreLayout, StoreSettings};
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Smallest accepted streaming chunk size: one tar block.
pub const MIN_CHUNK_SIZE: usize = 512;

/// Repository configuration, loadable from TOML.
///
/// ```toml
/// root = "/srv/aip"
/// layout = "archive"
/// archive_format = "tar_gz"
/// chunk_size = 65536
/// excluded_names = [".DS_Store"]
/// lock_mode = "fail_fast"
/// default_message = "ingest"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    pub layout: StoreLayout,
    pub archive_format: ArchiveFormat,
    pub chunk_size: usize,
    pub excluded_names: Vec<String>,
    pub lock_mode: LockMode,
    pub default_message: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            layout: StoreLayout::Directory,
            archive_format: ArchiveFormat::Tar,
            chunk_size: DEFAULT_CHUNK_SIZE,
            excluded_names: Vec::new(),
            lock_mode: LockMode::Blocking,
            default_message: "ingest".to_string(),
        }
    }
}

impl RepositoryConfig {
    /// Defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| SdkError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(SdkError::Config("root must not be empty".into()));
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(SdkError::Config(format!(
                "chunk_size must be at least {MIN_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.excluded_names.iter().any(|n| n.is_empty() || n.contains('/')) {
            return Err(SdkError::Config(
                "excluded_names must be plain, non-empty file names".into(),
            ));
        }
        Ok(())
    }

    /// The store-level subset of this configuration.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            excluded_names: self.excluded_names.clone(),
            lock_mode: self.lock_mode,
            default_message: self.default_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RepositoryConfig::default();
        assert_eq!(c.layout, StoreLayout::Directory);
        assert_eq!(c.archive_format, ArchiveFormat::Tar);
        assert_eq!(c.chunk_size, 65536);
        assert_eq!(c.lock_mode, LockMode::Blocking);
        assert_eq!(c.default_message, "ingest");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parses_full_toml() {
        let c = RepositoryConfig::from_toml_str(
            r#"
            root = "/srv/aip"
            layout = "archive"
            archive_format = "tar_gz"
            chunk_size = 4096
            excluded_names = [".DS_Store", "Thumbs.db"]
            lock_mode = "fail_fast"
            default_message = "migrate"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/aip"));
        assert_eq!(c.layout, StoreLayout::Archive);
        assert_eq!(c.archive_format, ArchiveFormat::TarGz);
        assert_eq!(c.chunk_size, 4096);
        assert_eq!(c.excluded_names.len(), 2);
        assert_eq!(c.lock_mode, LockMode::FailFast);
        assert_eq!(c.default_message, "migrate");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c = RepositoryConfig::from_toml_str("root = \"/data\"").unwrap();
        assert_eq!(c, RepositoryConfig::new("/data"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(RepositoryConfig::from_toml_str("chunk_size = 0").is_err());
        assert!(RepositoryConfig::from_toml_str("chunk_size = 100").is_err());
        assert!(RepositoryConfig::from_toml_str("root = \"\"").is_err());
        assert!(RepositoryConfig::from_toml_str("layout = \"zip\"").is_err());
        let err = RepositoryConfig::from_toml_str("excluded_names = [\"a/b\"]").unwrap_err();
        assert_eq!(err.kind(), aip_types::ErrorKind::InvalidInput);
    }

    #[test]
    fn toml_round_trip_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = RepositoryConfig::new(dir.path().join("repo"));
        c.layout = StoreLayout::Archive;
        c.excluded_names = vec!["skip".into()];
        let path = dir.path().join("aip.toml");
        fs::write(&path, c.to_toml_string().unwrap()).unwrap();
        assert_eq!(RepositoryConfig::load(&path).unwrap(), c);
    }

    #[test]
    fn settings_carry_store_fields() {
        let mut c = RepositoryConfig::new("/r");
        c.lock_mode = LockMode::FailFast;
        c.default_message = "m".into();
        let s = c.store_settings();
        assert_eq!(s.lock_mode, LockMode::FailFast);
        assert_eq!(s.default_message, "m");
    }
}
