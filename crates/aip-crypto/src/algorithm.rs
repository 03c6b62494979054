use std::fmt;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::DigestError;

/// Supported content digest algorithms.
///
/// Serialized names match the inventory's `digestAlgorithm` and `fixity`
/// keys: `md5`, `sha256`, `sha512`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex digest in characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    pub(crate) fn hasher(&self) -> StreamHasher {
        match self {
            Self::Md5 => StreamHasher::Md5(Md5::new()),
            Self::Sha256 => StreamHasher::Sha256(Sha256::new()),
            Self::Sha512 => StreamHasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    /// Accepts `md5`, `sha256`/`sha-256` and `sha512`/`sha-512` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Incremental hash state for one algorithm.
pub(crate) enum StreamHasher {
    Md5(Md5),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl StreamHasher {
    pub(crate) fn update(&mut self, block: &[u8]) {
        match self {
            Self::Md5(h) => h.update(block),
            Self::Sha256(h) => h.update(block),
            Self::Sha512(h) => h.update(block),
        }
    }

    pub(crate) fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("MD5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!("SHA-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("sha512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert_eq!("Sha-512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
    }

    #[test]
    fn rejects_unknown() {
        let err = "crc32".parse::<DigestAlgorithm>().unwrap_err();
        assert!(matches!(err, DigestError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn serde_names_are_lowercase() {
        let json = serde_json::to_string(&DigestAlgorithm::Sha512).unwrap();
        assert_eq!(json, "\"sha512\"");
        let parsed: DigestAlgorithm = serde_json::from_str("\"md5\"").unwrap();
        assert_eq!(parsed, DigestAlgorithm::Md5);
    }

    #[test]
    fn empty_input_digests() {
        let mut md5 = DigestAlgorithm::Md5.hasher();
        md5.update(b"");
        assert_eq!(md5.finalize_hex(), "d41d8cd98f00b204e9800998ecf8427e");

        let sha256 = DigestAlgorithm::Sha256.hasher();
        assert_eq!(
            sha256.finalize_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hex_len_matches_output() {
        for alg in [DigestAlgorithm::Md5, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512] {
            assert_eq!(alg.hasher().finalize_hex().len(), alg.hex_len());
        }
    }
}
