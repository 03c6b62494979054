//! Post-transfer verification.

use std::path::Path;

use tracing::debug;

use crate::algorithm::DigestAlgorithm;
use crate::digester::digest_file;
use crate::error::{DigestError, DigestResult};

fn file_size(path: &Path) -> DigestResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| DigestError::io(path, e))
}

/// Verify that `path` has exactly `expected_size` bytes and digests to
/// `expected` under `algorithm`. Size is checked first since it is cheap.
pub fn verify_file(
    path: &Path,
    expected_size: u64,
    expected: &str,
    algorithm: DigestAlgorithm,
) -> DigestResult<()> {
    let actual = file_size(path)?;
    if actual != expected_size {
        return Err(DigestError::SizeMismatch {
            path: path.to_path_buf(),
            expected: expected_size,
            actual,
        });
    }
    let digests = digest_file(path, &[algorithm])?;
    let computed = digests.get(algorithm).unwrap_or_default();
    if !computed.eq_ignore_ascii_case(expected) {
        return Err(DigestError::ChecksumMismatch {
            path: path.to_path_buf(),
            algorithm,
            expected: expected.to_string(),
            computed: computed.to_string(),
        });
    }
    Ok(())
}

/// Check that a copy from `source` to `target` succeeded by comparing
/// sizes, then SHA-256 digests.
pub fn check_transfer(source: &Path, target: &Path) -> DigestResult<()> {
    let digests = digest_file(source, &[DigestAlgorithm::Sha256])?;
    let expected = digests.get(DigestAlgorithm::Sha256).unwrap_or_default();
    verify_file(target, digests.size, expected, DigestAlgorithm::Sha256)?;
    debug!(source = %source.display(), target = %target.display(), "transfer verified");
    Ok(())
}

/// `true` if both files exist and have the same SHA-256 digest.
pub fn files_identical(a: &Path, b: &Path) -> DigestResult<bool> {
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    let da = digest_file(a, &[DigestAlgorithm::Sha256])?;
    let db = digest_file(b, &[DigestAlgorithm::Sha256])?;
    Ok(da.size == db.size && da.get(DigestAlgorithm::Sha256) == db.get(DigestAlgorithm::Sha256))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aip_types::ErrorKind;

    fn pair(a: &[u8], b: &[u8]) -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let pa = dir.path().join("a");
        let pb = dir.path().join("b");
        std::fs::write(&pa, a).unwrap();
        std::fs::write(&pb, b).unwrap();
        (dir, pa, pb)
    }

    #[test]
    fn identical_copy_passes() {
        let (_dir, a, b) = pair(b"payload", b"payload");
        check_transfer(&a, &b).unwrap();
    }

    #[test]
    fn truncated_copy_is_size_mismatch() {
        let (_dir, a, b) = pair(b"payload", b"pay");
        let err = check_transfer(&a, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn same_size_different_bytes_is_checksum_mismatch() {
        let (_dir, a, b) = pair(b"payload", b"paylaod");
        let err = check_transfer(&a, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }

    #[test]
    fn single_flipped_byte_fails_sha512_verification() {
        let (_dir, a, _b) = pair(b"archival content", b"");
        let digest = crate::sha512_file(&a).unwrap();
        let mut bytes = std::fs::read(&a).unwrap();
        bytes[3] ^= 0x01;
        std::fs::write(&a, &bytes).unwrap();
        let err =
            verify_file(&a, bytes.len() as u64, &digest, DigestAlgorithm::Sha512).unwrap_err();
        assert!(matches!(
            err,
            DigestError::ChecksumMismatch { algorithm: DigestAlgorithm::Sha512, .. }
        ));
    }

    #[test]
    fn files_identical_cases() {
        let (dir, a, b) = pair(b"same", b"same");
        assert!(files_identical(&a, &b).unwrap());
        std::fs::write(&b, b"diff").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &dir.path().join("missing")).unwrap());
    }
}
