use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::algorithm::{DigestAlgorithm, StreamHasher};
use crate::error::{DigestError, DigestResult};

/// Read block size for streaming digests.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Digests of one file, computed in a single pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigests {
    /// Number of bytes hashed.
    pub size: u64,
    digests: BTreeMap<DigestAlgorithm, String>,
}

impl FileDigests {
    /// Hex digest for `algorithm`, if it was requested.
    pub fn get(&self, algorithm: DigestAlgorithm) -> Option<&str> {
        self.digests.get(&algorithm).map(String::as_str)
    }

    /// Iterate `(algorithm, hex)` pairs in algorithm order.
    pub fn iter(&self) -> impl Iterator<Item = (DigestAlgorithm, &str)> {
        self.digests.iter().map(|(a, d)| (*a, d.as_str()))
    }
}

/// Compute every requested digest of a reader in one pass.
pub fn digest_reader<R: Read>(
    mut reader: R,
    algorithms: &[DigestAlgorithm],
) -> std::io::Result<FileDigests> {
    let mut hashers: Vec<(DigestAlgorithm, StreamHasher)> =
        algorithms.iter().map(|a| (*a, a.hasher())).collect();
    let mut block = vec![0u8; BLOCK_SIZE];
    let mut size = 0u64;
    loop {
        let n = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        size += n as u64;
        for (_, hasher) in hashers.iter_mut() {
            hasher.update(&block[..n]);
        }
    }
    let digests = hashers
        .into_iter()
        .map(|(a, h)| (a, h.finalize_hex()))
        .collect();
    Ok(FileDigests { size, digests })
}

/// Compute every requested digest of the file at `path` in one pass.
pub fn digest_file(path: &Path, algorithms: &[DigestAlgorithm]) -> DigestResult<FileDigests> {
    let file = File::open(path).map_err(|e| DigestError::io(path, e))?;
    digest_reader(file, algorithms).map_err(|e| DigestError::io(path, e))
}

fn single(path: &Path, algorithm: DigestAlgorithm) -> DigestResult<String> {
    let digests = digest_file(path, &[algorithm])?;
    Ok(digests.get(algorithm).unwrap_or_default().to_string())
}

pub fn md5_file(path: &Path) -> DigestResult<String> {
    single(path, DigestAlgorithm::Md5)
}

pub fn sha256_file(path: &Path) -> DigestResult<String> {
    single(path, DigestAlgorithm::Sha256)
}

pub fn sha512_file(path: &Path) -> DigestResult<String> {
    single(path, DigestAlgorithm::Sha512)
}

/// Returns `true` if the file's digest equals `expected` (case-insensitive hex).
pub fn validate_checksum(
    path: &Path,
    expected: &str,
    algorithm: DigestAlgorithm,
) -> DigestResult<bool> {
    Ok(single(path, algorithm)?.eq_ignore_ascii_case(expected))
}
