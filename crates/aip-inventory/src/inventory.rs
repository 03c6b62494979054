use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use aip_crypto::DigestAlgorithm;
use aip_types::{Identifier, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};

/// File name of the inventory inside an object's data directory.
pub const INVENTORY_FILE: &str = "inventory.json";

/// Value of the inventory's `type` field.
pub const INVENTORY_TYPE: &str = "https://ocfl.io/1.1/spec/#inventory";

/// Name and content of the object declaration file.
pub const OBJECT_DECLARATION: &str = "0=ocfl_object_1.0";
pub const DECLARATION_BODY: &str = "ocfl_object_1.0";

/// Digest to paths. Paths are kept in insertion order, digests sorted.
pub type PathsByDigest = BTreeMap<String, Vec<String>>;

/// One committed version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub created: DateTime<Utc>,
    pub message: String,
    /// The complete logical state: digest to logical paths.
    pub state: PathsByDigest,
    /// Paths whose content was written into this version's directory.
    #[serde(default)]
    pub added: Vec<String>,
    /// Paths present in the previous version but not in this one.
    #[serde(default)]
    pub removed: Vec<String>,
}

impl VersionEntry {
    /// Digest recorded for a logical path, if present.
    pub fn digest_of(&self, logical_path: &str) -> Option<&str> {
        self.state
            .iter()
            .find(|(_, paths)| paths.iter().any(|p| p == logical_path))
            .map(|(digest, _)| digest.as_str())
    }

    /// All logical paths of this version, sorted.
    pub fn paths(&self) -> BTreeSet<&str> {
        self.state
            .values()
            .flat_map(|paths| paths.iter().map(String::as_str))
            .collect()
    }
}

/// Per-object version ledger, serialized as `inventory.json`.
///
/// Field order here is the field order on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub digest_algorithm: DigestAlgorithm,
    pub id: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<VersionId>,
    #[serde(default)]
    pub manifest: PathsByDigest,
    /// Secondary algorithm name to digest to content paths.
    #[serde(default)]
    pub fixity: BTreeMap<String, PathsByDigest>,
    #[serde(default)]
    pub versions: BTreeMap<VersionId, VersionEntry>,
    #[serde(rename = "type")]
    pub inventory_type: String,
}

impl Inventory {
    /// An inventory with no versions yet.
    pub fn new(id: Identifier) -> Self {
        Self {
            digest_algorithm: DigestAlgorithm::Sha512,
            id,
            head: None,
            manifest: BTreeMap::new(),
            fixity: BTreeMap::new(),
            versions: BTreeMap::new(),
            inventory_type: INVENTORY_TYPE.to_string(),
        }
    }

    pub fn head(&self) -> Option<VersionId> {
        self.head
    }

    pub fn version(&self, version: VersionId) -> Option<&VersionEntry> {
        self.versions.get(&version)
    }

    /// Recorded versions in ascending order.
    pub fn version_ids(&self) -> Vec<VersionId> {
        self.versions.keys().copied().collect()
    }

    /// First content path stored for a digest.
    pub fn content_path(&self, digest: &str) -> Option<&str> {
        self.manifest
            .get(digest)
            .and_then(|paths| paths.first())
            .map(String::as_str)
    }

    /// Map each logical path of `version` to the content path that holds
    /// its bytes.
    pub fn logical_state(&self, version: VersionId) -> InventoryResult<BTreeMap<String, String>> {
        let entry = self
            .version(version)
            .ok_or(InventoryError::VersionNotFound(version))?;
        let mut state = BTreeMap::new();
        for (digest, paths) in &entry.state {
            let content = self.content_path(digest).ok_or_else(|| {
                InventoryError::corrupt(
                    INVENTORY_FILE,
                    format!("{version} state digest {digest} missing from manifest"),
                )
            })?;
            for path in paths {
                state.insert(path.clone(), content.to_string());
            }
        }
        Ok(state)
    }

    /// `true` if any recorded version holds `logical_path` with `digest`.
    pub fn has_path_with_digest(&self, logical_path: &str, digest: &str) -> bool {
        self.versions.values().any(|entry| {
            entry
                .state
                .get(digest)
                .is_some_and(|paths| paths.iter().any(|p| p == logical_path))
        })
    }

    /// Record a content path under `digest` unless already present.
    pub fn add_manifest_path(&mut self, digest: &str, content_path: &str) {
        push_unique(self.manifest.entry(digest.to_string()).or_default(), content_path);
    }

    /// Record a content path under a secondary algorithm's digest.
    pub fn add_fixity(&mut self, algorithm: DigestAlgorithm, digest: &str, content_path: &str) {
        let by_digest = self.fixity.entry(algorithm.name().to_string()).or_default();
        push_unique(by_digest.entry(digest.to_string()).or_default(), content_path);
    }

    /// Secondary digest recorded for a content path.
    pub fn fixity_of(&self, algorithm: DigestAlgorithm, content_path: &str) -> Option<&str> {
        self.fixity.get(algorithm.name())?.iter().find_map(|(digest, paths)| {
            paths
                .iter()
                .any(|p| p == content_path)
                .then_some(digest.as_str())
        })
    }

    /// Check the structural invariants of a loaded inventory.
    ///
    /// `source` names the file for error messages.
    pub fn validate(&self, source: &Path) -> InventoryResult<()> {
        if self.digest_algorithm != DigestAlgorithm::Sha512 {
            return Err(InventoryError::AlgorithmChanged {
                found: self.digest_algorithm.name().to_string(),
            });
        }
        if self.inventory_type != INVENTORY_TYPE {
            return Err(InventoryError::corrupt(
                source,
                format!("unexpected type {}", self.inventory_type),
            ));
        }
        let highest = self.versions.keys().next_back().copied();
        if self.head != highest {
            return Err(InventoryError::corrupt(
                source,
                format!("head {:?} is not the highest version {:?}", self.head, highest),
            ));
        }
        for (version, entry) in &self.versions {
            if let Some(digest) = entry.state.keys().find(|d| !self.manifest.contains_key(*d)) {
                return Err(InventoryError::corrupt(
                    source,
                    format!("{version} state digest {digest} missing from manifest"),
                ));
            }
        }
        Ok(())
    }

    /// Parse and validate inventory JSON.
    pub fn from_json_slice(bytes: &[u8], source: &Path) -> InventoryResult<Self> {
        let inventory: Self = serde_json::from_slice(bytes)
            .map_err(|e| InventoryError::corrupt(source, e.to_string()))?;
        inventory.validate(source)?;
        Ok(inventory)
    }

    /// Serialize with four-space indentation.
    pub fn to_json_vec(&self) -> InventoryResult<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| InventoryError::Serialization(e.to_string()))?;
        Ok(buf)
    }
}

fn push_unique(paths: &mut Vec<String>, path: &str) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}
