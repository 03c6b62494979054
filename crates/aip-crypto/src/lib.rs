//! Content digests for the AIP storage core.
//!
//! Files are streamed in fixed 64 KiB blocks; every requested algorithm is
//! updated from the same block, so one pass over the file yields all
//! digests. Nothing here buffers a whole file.

pub mod algorithm;
pub mod digester;
pub mod error;
pub mod transfer;

pub use algorithm::DigestAlgorithm;
pub use digester::{
    digest_file, digest_reader, md5_file, sha256_file, sha512_file, validate_checksum, FileDigests,
    BLOCK_SIZE,
};
pub use error::{DigestError, DigestResult};
pub use transfer::{check_transfer, files_identical, verify_file};
