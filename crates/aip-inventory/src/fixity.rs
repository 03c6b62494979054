//! Fixity audit: recompute every stored file's digests and compare them
//! with what the inventory recorded.

use std::path::Path;

use aip_crypto::{digest_file, DigestAlgorithm};
use tracing::{debug, warn};

use crate::error::InventoryResult;
use crate::inventory::Inventory;

/// One content file that failed its fixity check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixityFailure {
    /// Version-qualified content path, e.g. `v00001/a.txt`.
    pub content_path: String,
    pub algorithm: DigestAlgorithm,
    pub expected: String,
    /// `None` when the file is missing.
    pub computed: Option<String>,
}

/// Outcome of a fixity audit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixityReport {
    /// Number of content files examined.
    pub checked: usize,
    pub failures: Vec<FixityFailure>,
}

impl FixityReport {
    /// Returns `true` if every file matched.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Audit every manifest path below `data_dir` against its SHA-512 and,
/// where recorded, its MD5 fixity.
pub fn verify_fixity(inventory: &Inventory, data_dir: &Path) -> InventoryResult<FixityReport> {
    let mut report = FixityReport::default();

    for (sha512, paths) in &inventory.manifest {
        for content_path in paths {
            report.checked += 1;
            let file = data_dir.join(content_path);
            if !file.is_file() {
                warn!(path = %content_path, "content file missing");
                report.failures.push(FixityFailure {
                    content_path: content_path.clone(),
                    algorithm: DigestAlgorithm::Sha512,
                    expected: sha512.clone(),
                    computed: None,
                });
                continue;
            }

            let md5 = inventory.fixity_of(DigestAlgorithm::Md5, content_path);
            let digests = digest_file(&file, &[DigestAlgorithm::Sha512, DigestAlgorithm::Md5])?;
            let expectations = std::iter::once((DigestAlgorithm::Sha512, Some(sha512.as_str())))
                .chain(std::iter::once((DigestAlgorithm::Md5, md5)));

            for (algorithm, expected) in expectations {
                let Some(expected) = expected else { continue };
                let computed = digests.get(algorithm).unwrap_or_default();
                if !computed.eq_ignore_ascii_case(expected) {
                    warn!(path = %content_path, %algorithm, "fixity mismatch");
                    report.failures.push(FixityFailure {
                        content_path: content_path.clone(),
                        algorithm,
                        expected: expected.to_string(),
                        computed: Some(computed.to_string()),
                    });
                }
            }
        }
    }

    debug!(
        id = %inventory.id,
        checked = report.checked,
        failures = report.failures.len(),
        "fixity audit finished"
    );
    Ok(report)
}
