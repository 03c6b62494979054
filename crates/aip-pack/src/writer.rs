use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use aip_types::CancellationToken;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PackError, PackResult};
use crate::format::ArchiveFormat;

/// Counts of what went into an archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub files: usize,
    pub empty_dirs: usize,
    pub bytes: u64,
}

/// Packs a payload directory into a tar stream.
///
/// Walks the tree in file-name order so equal trees produce equal
/// archives. Writes one entry per regular file and one explicit entry per
/// empty directory; tar has no other way to keep an empty directory.
/// Symlinks and special files are skipped.
pub struct ArchiveWriter {
    root: PathBuf,
    format: ArchiveFormat,
    excluded: Vec<String>,
    cancel: CancellationToken,
}

impl ArchiveWriter {
    /// Create a writer for the tree rooted at `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            format: ArchiveFormat::Tar,
            excluded: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    /// File names to leave out of the archive.
    pub fn with_excluded(mut self, names: &[String]) -> Self {
        self.excluded = names.to_vec();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write the archive to `path`.
    pub fn finish(&self, path: &Path) -> PackResult<PackSummary> {
        let file = File::create(path)?;
        let (summary, file) = self.write_to(file)?;
        file.sync_all()?;
        Ok(summary)
    }

    /// Build the archive in memory.
    pub fn finish_to_bytes(&self) -> PackResult<(Vec<u8>, PackSummary)> {
        let (summary, bytes) = self.write_to(Vec::new())?;
        Ok((bytes, summary))
    }

    /// Write the archive to any sink and hand the sink back.
    pub fn write_to<W: Write>(&self, out: W) -> PackResult<(PackSummary, W)> {
        match self.format {
            ArchiveFormat::Tar => {
                let mut builder = Builder::new(out);
                let summary = self.append_tree(&mut builder)?;
                Ok((summary, builder.into_inner()?))
            }
            ArchiveFormat::TarGz => {
                let mut builder = Builder::new(GzEncoder::new(out, Compression::default()));
                let summary = self.append_tree(&mut builder)?;
                let encoder = builder.into_inner()?;
                Ok((summary, encoder.finish()?))
            }
        }
    }

    fn append_tree<W: Write>(&self, builder: &mut Builder<W>) -> PackResult<PackSummary> {
        builder.follow_symlinks(false);
        let mut summary = PackSummary::default();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e.file_name().to_str()));

        for entry in walker {
            if self.cancel.is_cancelled() {
                return Err(PackError::Cancelled);
            }
            let entry = entry.map_err(|e| PackError::Walk(e.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| PackError::InvalidPath(entry.path().display().to_string()))?;
            let name = archive_name(rel)?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if !self.is_empty_after_exclusion(entry.path())? {
                    continue;
                }
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_mtime(mtime_of(entry.path()));
                builder.append_data(&mut header, &name, std::io::empty())?;
                summary.empty_dirs += 1;
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| PackError::Walk(e.to_string()))?;
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(metadata.len());
                header.set_mtime(mtime_of(entry.path()));
                builder.append_data(&mut header, &name, File::open(entry.path())?)?;
                summary.files += 1;
                summary.bytes += metadata.len();
            } else {
                debug!(path = %entry.path().display(), "skipping non-regular file");
            }
        }

        builder.finish()?;
        debug!(
            root = %self.root.display(),
            files = summary.files,
            empty_dirs = summary.empty_dirs,
            "packed payload"
        );
        Ok(summary)
    }

    /// `true` if every child of `dir` is an excluded name.
    fn is_empty_after_exclusion(&self, dir: &Path) -> PackResult<bool> {
        for child in fs::read_dir(dir)? {
            if !self.is_excluded(child?.file_name().to_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_excluded(&self, name: Option<&str>) -> bool {
        name.map(|n| self.excluded.iter().any(|e| e == n))
            .unwrap_or(false)
    }
}

/// POSIX member name for a path relative to the payload root.
fn archive_name(rel: &Path) -> PackResult<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| PackError::InvalidPath(rel.display().to_string()))?,
            ),
            _ => return Err(PackError::InvalidPath(rel.display().to_string())),
        }
    }
    if parts.is_empty() {
        return Err(PackError::InvalidPath(rel.display().to_string()));
    }
    Ok(parts.join("/"))
}

fn mtime_of(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
