//! Path Resolver: pairtree fan-out of safe names.
//!
//! A safe name is cut into 2-character segments, each one directory level,
//! with an odd trailing character as the final leaf: `abcde` resolves to
//! `ab/cd/e`. Every directory therefore has a bounded number of children
//! regardless of how many objects the repository holds.

use std::path::{Component, Path, PathBuf};

use aip_types::{Identifier, SafeName};

use crate::error::{StoreError, StoreResult};

/// Width of one fan-out segment.
pub const SEGMENT_WIDTH: usize = 2;

/// Split a safe name into its fan-out segments.
pub fn fan_out(safe: &SafeName) -> Vec<&str> {
    let name = safe.as_str();
    // Safe names are ASCII, so every byte offset is a char boundary.
    (0..name.len())
        .step_by(SEGMENT_WIDTH)
        .map(|start| &name[start..(start + SEGMENT_WIDTH).min(name.len())])
        .collect()
}

/// Resolves identifiers to object roots below a repository root.
///
/// Pure: nothing is created on disk.
#[derive(Clone, Debug)]
pub struct PairtreeResolver {
    root: PathBuf,
}

impl PairtreeResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The object root for a safe name.
    pub fn resolve(&self, safe: &SafeName) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(fan_out(safe));
        path
    }

    /// The object root for an identifier.
    pub fn object_root(&self, id: &Identifier) -> PathBuf {
        self.resolve(&id.safe_name())
    }

    /// Rebuild the identifier stored at `object_root` by concatenating its
    /// fan-out segments.
    ///
    /// Only canonical fan-out paths are accepted: every segment but the
    /// last is exactly [`SEGMENT_WIDTH`] characters and the last is 1 or 2.
    pub fn identifier_from_path(&self, object_root: &Path) -> StoreResult<Identifier> {
        let invalid =
            || StoreError::InvalidInput(format!("not an object root: {}", object_root.display()));
        let rel = object_root.strip_prefix(&self.root).map_err(|_| invalid())?;

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str().ok_or_else(invalid)?),
                _ => return Err(invalid()),
            }
        }
        let (leaf, inner) = segments.split_last().ok_or_else(invalid)?;
        if leaf.is_empty()
            || leaf.len() > SEGMENT_WIDTH
            || inner.iter().any(|s| s.len() != SEGMENT_WIDTH)
        {
            return Err(invalid());
        }
        Ok(SafeName::parse(segments.concat())?.decode()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    #[test]
    fn splits_into_pairs_with_leaf_remainder() {
        let safe = SafeName::parse("abcde").unwrap();
        assert_eq!(fan_out(&safe), vec!["ab", "cd", "e"]);
        let even = SafeName::parse("abcd").unwrap();
        assert_eq!(fan_out(&even), vec!["ab", "cd"]);
    }

    #[test]
    fn resolves_below_root() {
        let resolver = PairtreeResolver::new("/repo");
        let path = resolver.object_root(&id("urn:test:1"));
        assert_eq!(path, PathBuf::from("/repo/ur/n+/te/st/+1"));
    }

    #[test]
    fn long_identifier_has_bounded_segments() {
        let long: String = "x".repeat(1000);
        let safe = id(&long).safe_name();
        let segments = fan_out(&safe);
        assert_eq!(segments.len(), 500);
        assert!(segments.iter().all(|s| s.len() == SEGMENT_WIDTH));

        let odd = id(&"y".repeat(999)).safe_name();
        let segments = fan_out(&odd);
        assert_eq!(segments.len(), 500);
        let (leaf, inner) = segments.split_last().unwrap();
        assert_eq!(leaf.len(), 1);
        assert!(inner.iter().all(|s| s.len() == SEGMENT_WIDTH));
    }

    #[test]
    fn path_round_trips_to_identifier() {
        let resolver = PairtreeResolver::new("/repo");
        let original = id("https://doi.org/10.5281/zenodo.4514864");
        let root = resolver.object_root(&original);
        assert_eq!(resolver.identifier_from_path(&root).unwrap(), original);
    }

    #[test]
    fn foreign_paths_are_rejected() {
        let resolver = PairtreeResolver::new("/repo");
        assert!(resolver.identifier_from_path(Path::new("/elsewhere/ab")).is_err());
        assert!(resolver.identifier_from_path(Path::new("/repo/abc/d")).is_err());
        assert!(resolver.identifier_from_path(Path::new("/repo")).is_err());
    }

    #[test]
    fn non_canonical_segments_are_rejected() {
        let resolver = PairtreeResolver::new("/repo");
        assert!(resolver.identifier_from_path(Path::new("/repo/a/bc")).is_err());
        assert!(resolver.identifier_from_path(Path::new("/repo/ab/c/de")).is_err());
        assert_eq!(
            resolver.identifier_from_path(Path::new("/repo/ab/c")).unwrap(),
            id("abc")
        );
    }

    proptest! {
        #[test]
        fn depth_is_half_the_safe_name(s in "\\PC{1,200}") {
            let safe = id(&s).safe_name();
            let segments = fan_out(&safe);
            prop_assert_eq!(segments.len(), safe.len().div_ceil(SEGMENT_WIDTH));
            prop_assert_eq!(segments.concat(), safe.as_str());
        }
    }
}
