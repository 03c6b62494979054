use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// On-disk archive encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// Uncompressed POSIX tar.
    #[default]
    Tar,
    /// Gzip-compressed tar.
    TarGz,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }

    /// Detect the format from a file name.
    pub fn from_file_name(name: &str) -> PackResult<Self> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(PackError::UnsupportedFormat(name.to_string()))
        }
    }

    /// Detect the format from a path's file name.
    pub fn from_path(path: &Path) -> PackResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PackError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_file_name(name)
    }
}

/// Shared, cheaply clonable archive bytes.
#[derive(Clone, Debug)]
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Where archive bytes come from. Every `open` starts a fresh stream
/// from the beginning of the archive.
#[derive(Clone, Debug)]
pub enum ArchiveSource {
    File { path: PathBuf, format: ArchiveFormat },
    Bytes { data: Arc<Vec<u8>>, format: ArchiveFormat },
}

impl ArchiveSource {
    /// A file source, with the format taken from its name.
    pub fn file(path: impl Into<PathBuf>) -> PackResult<Self> {
        let path = path.into();
        let format = ArchiveFormat::from_path(&path)?;
        Ok(Self::File { path, format })
    }

    pub fn bytes(data: Vec<u8>, format: ArchiveFormat) -> Self {
        Self::Bytes {
            data: Arc::new(data),
            format,
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            Self::File { format, .. } | Self::Bytes { format, .. } => *format,
        }
    }

    /// Open a decoded (decompressed) tar stream.
    pub fn open(&self) -> PackResult<Box<dyn Read + Send>> {
        let raw: Box<dyn Read + Send> = match self {
            Self::File { path, .. } => Box::new(File::open(path)?),
            Self::Bytes { data, .. } => Box::new(Cursor::new(SharedBytes(Arc::clone(data)))),
        };
        Ok(match self.format() {
            ArchiveFormat::Tar => raw,
            ArchiveFormat::TarGz => Box::new(GzDecoder::new(raw)),
        })
    }
}
