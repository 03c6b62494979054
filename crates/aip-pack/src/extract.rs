use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use tar::{Archive, EntryType};
use tracing::{debug, warn};

use crate::error::{PackError, PackResult};
use crate::format::ArchiveSource;

/// One member of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    /// Normalized POSIX name, no leading `./`, no trailing `/`.
    pub name: String,
    pub size: u64,
    pub entry_type: EntryType,
}

/// Counts of what an extraction wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

pub(crate) fn member_name(path: &Path) -> String {
    let name = path.to_string_lossy();
    let name = name.strip_prefix("./").unwrap_or(&name);
    name.trim_end_matches('/').to_string()
}

/// Resolve a member path lexically against the extraction root.
///
/// Returns `None` when the path is absolute or climbs above the root.
fn resolve_member(member: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in member.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Check a link member's target. Symlink targets resolve against the
/// member's directory, hard-link targets against the archive root.
fn link_escapes(member: &Path, target: &Path, entry_type: EntryType) -> bool {
    if target.is_absolute() {
        return true;
    }
    let joined = match entry_type {
        EntryType::Symlink => member.parent().unwrap_or(Path::new("")).join(target),
        _ => target.to_path_buf(),
    };
    resolve_member(&joined).is_none()
}

/// List every member of an archive.
pub fn list_members(source: &ArchiveSource) -> PackResult<Vec<MemberInfo>> {
    let mut archive = Archive::new(source.open()?);
    let mut members = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        members.push(MemberInfo {
            name: member_name(&entry.path()?),
            size: entry.size(),
            entry_type: entry.header().entry_type(),
        });
    }
    Ok(members)
}

/// `true` if the archive has a member with this name.
pub fn has_member(source: &ArchiveSource, name: &str) -> PackResult<bool> {
    let wanted = member_name(Path::new(name));
    Ok(list_members(source)?.iter().any(|m| m.name == wanted))
}

/// Validate every member without writing anything.
fn validate(source: &ArchiveSource) -> PackResult<usize> {
    let mut archive = Archive::new(source.open()?);
    let mut count = 0;
    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?.into_owned();
        if resolve_member(&path).is_none() {
            warn!(member = %path.display(), "rejecting archive: member escapes root");
            return Err(PackError::PathTraversal {
                member: path.display().to_string(),
            });
        }
        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            if let Some(target) = entry.link_name()? {
                if link_escapes(&path, &target, entry_type) {
                    warn!(
                        member = %path.display(),
                        target = %target.display(),
                        "rejecting archive: link escapes root"
                    );
                    return Err(PackError::PathTraversal {
                        member: format!("{} -> {}", path.display(), target.display()),
                    });
                }
            }
        }
        count += 1;
    }
    Ok(count)
}

/// Extract an archive below `dest`.
///
/// All member paths are validated first; if any member would resolve
/// outside `dest` the whole archive is rejected with
/// [`PackError::PathTraversal`] and nothing is written. Link members are
/// validated but never materialized.
pub fn unpack(source: &ArchiveSource, dest: &Path) -> PackResult<UnpackSummary> {
    let members = validate(source)?;
    fs::create_dir_all(dest)?;

    let mut summary = UnpackSummary::default();
    let mut archive = Archive::new(source.open()?);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let rel = resolve_member(&path).ok_or_else(|| PackError::PathTraversal {
            member: path.display().to_string(),
        })?;
        let target = dest.join(&rel);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
                summary.directories += 1;
            }
            t if t.is_file() => {
                if rel.as_os_str().is_empty() {
                    return Err(PackError::InvalidPath(path.display().to_string()));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out)?;
                summary.files += 1;
            }
            other => {
                debug!(
                    member = %path.display(),
                    entry_type = ?other,
                    "skipping non-regular member"
                );
                summary.skipped += 1;
            }
        }
    }
    debug!(dest = %dest.display(), members, files = summary.files, "unpacked archive");
    Ok(summary)
}

/// Extract the archive file at `path`, detecting its format from the name.
pub fn unpack_file(path: &Path, dest: &Path) -> PackResult<UnpackSummary> {
    unpack(&ArchiveSource::file(path)?, dest)
}
