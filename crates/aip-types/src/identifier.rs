//! Identifier codec.
//!
//! Maps an opaque identifier to a filesystem-safe name and back, following
//! the pairtree cleaning rules:
//!
//! 1. Every byte in the reserved set `" * + , < = > ? \ ^ |` and space, and
//!    every byte outside printable ASCII (`0x21..=0x7e`), becomes `^xx`
//!    (two lowercase hex digits).
//! 2. The characters `/ : .` are then translated to `= + ,`.
//!
//! Decoding reverses the translation first, then expands the `^xx` escapes.
//! Non-ASCII identifiers are escaped byte-wise over their UTF-8 encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Bytes that are hex-escaped even though they are printable.
const RESERVED: &[u8] = b"\"*+,<=>?\\^| ";

/// Escape introducer.
const ESCAPE: u8 = b'^';

/// Opaque identifier of an archival object (URI, URN, DOI, ...).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Create an identifier. Rejects the empty string.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self(value))
    }

    /// The identifier as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filesystem-safe encoding of this identifier.
    pub fn safe_name(&self) -> SafeName {
        SafeName::encode(self)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?})", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Filesystem-safe, reversible encoding of an [`Identifier`].
///
/// A safe name consists solely of printable ASCII and never contains `/`,
/// `:` or `.`, so it can be split into directory segments freely.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafeName(String);

impl SafeName {
    /// Encode an identifier. Total: every identifier has a safe name.
    pub fn encode(id: &Identifier) -> Self {
        let mut escaped = String::with_capacity(id.as_str().len());
        for &byte in id.as_str().as_bytes() {
            if RESERVED.contains(&byte) || !(0x21..=0x7e).contains(&byte) {
                escaped.push(ESCAPE as char);
                escaped.push_str(&hex::encode([byte]));
            } else {
                escaped.push(byte as char);
            }
        }
        let translated = escaped
            .chars()
            .map(|c| match c {
                '/' => '=',
                ':' => '+',
                '.' => ',',
                other => other,
            })
            .collect();
        Self(translated)
    }

    /// Accept an already-encoded name, e.g. one reassembled from a
    /// directory path. Only the character set is checked here; escapes are
    /// checked by [`SafeName::decode`].
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::InvalidSafeName {
                name: value,
                reason: "empty".into(),
            });
        }
        if let Some(bad) = value
            .bytes()
            .find(|b| !(0x21..=0x7e).contains(b) || matches!(b, b'/' | b':' | b'.'))
        {
            return Err(TypeError::InvalidSafeName {
                reason: format!("contains forbidden byte 0x{bad:02x}"),
                name: value,
            });
        }
        Ok(Self(value))
    }

    /// Decode back to the original identifier.
    pub fn decode(&self) -> Result<Identifier, TypeError> {
        let translated: Vec<u8> = self
            .0
            .bytes()
            .map(|b| match b {
                b'=' => b'/',
                b'+' => b':',
                b',' => b'.',
                other => other,
            })
            .collect();

        let mut bytes = Vec::with_capacity(translated.len());
        let mut i = 0;
        while i < translated.len() {
            if translated[i] != ESCAPE {
                bytes.push(translated[i]);
                i += 1;
                continue;
            }
            let digits = translated
                .get(i + 1..i + 3)
                .ok_or_else(|| self.invalid("truncated escape"))?;
            let decoded =
                hex::decode(digits).map_err(|e| self.invalid(&format!("bad escape: {e}")))?;
            bytes.extend_from_slice(&decoded);
            i += 3;
        }

        let value = String::from_utf8(bytes).map_err(|e| TypeError::InvalidUtf8(e.to_string()))?;
        Identifier::new(value)
    }

    /// The encoded name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded name in bytes (always ASCII).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for names built by `encode` or `parse`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn invalid(&self, reason: &str) -> TypeError {
        TypeError::InvalidSafeName {
            name: self.0.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Debug for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SafeName({:?})", self.0)
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
