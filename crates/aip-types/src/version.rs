use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Minimum number of digits in a formatted version id.
const PAD_WIDTH: usize = 5;

/// A version ordinal of a storage object.
///
/// Versions are 1-based and formatted as `v` followed by the ordinal
/// zero-padded to five digits: `v00001`, `v00002`, ... Ordinals above
/// 99999 simply grow wider (`v100000`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(u32);

impl VersionId {
    /// The first version of every object.
    pub const FIRST: Self = Self(1);

    /// Create a version id from an ordinal. Rejects zero.
    pub fn new(ordinal: u32) -> Result<Self, TypeError> {
        if ordinal == 0 {
            return Err(TypeError::ZeroVersion);
        }
        Ok(Self(ordinal))
    }

    /// The numeric ordinal.
    pub fn ordinal(&self) -> u32 {
        self.0
    }

    /// The following version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// The preceding version, if any.
    pub fn prev(&self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({self})")
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:0width$}", self.0, width = PAD_WIDTH)
    }
}

impl FromStr for VersionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidVersion(s.to_string());
        let digits = s.strip_prefix('v').ok_or_else(invalid)?;
        if digits.len() < PAD_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let ordinal: u32 = digits.parse().map_err(|_| invalid())?;
        // Only the canonical rendering is accepted, so `v000001` is rejected.
        let parsed = Self::new(ordinal)?;
        if parsed.to_string() != s {
            return Err(invalid());
        }
        Ok(parsed)
    }
}

impl TryFrom<String> for VersionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionId> for String {
    fn from(v: VersionId) -> Self {
        v.to_string()
    }
}
