//! Tar packaging for the AIP storage core.
//!
//! # Architecture
//!
//! - **ArchiveWriter**: packs a payload tree into a tar (optionally gzip)
//!   stream, one entry per file and one per empty directory
//! - **unpack / unpack_file**: extraction that validates every member path
//!   before writing anything; one escaping member rejects the archive
//! - **ChunkStream**: lazy fixed-size chunk iterator over a single archive
//!   member or a plain file, reporting percent progress
//!
//! Member names are POSIX relative paths rooted at the payload root.

pub mod chunks;
pub mod error;
pub mod extract;
pub mod format;
pub mod writer;

pub use chunks::{ChunkStream, EntryStream, DEFAULT_CHUNK_SIZE};
pub use error::{PackError, PackResult};
pub use extract::{has_member, list_members, unpack, unpack_file, MemberInfo, UnpackSummary};
pub use format::{ArchiveFormat, ArchiveSource};
pub use writer::{ArchiveWriter, PackSummary};
