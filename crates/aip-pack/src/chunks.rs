use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use aip_types::{NoopProgress, ProgressObserver};
use tar::Archive;
use tracing::debug;

use crate::error::{PackError, PackResult};
use crate::extract::member_name;
use crate::format::{ArchiveFormat, ArchiveSource};

/// Default chunk size for streamed reads.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Lazy iterator of fixed-size chunks over a bounded reader.
///
/// Every chunk but the last is exactly `chunk_size` bytes. After each chunk
/// the observer receives the percentage of the declared size consumed so
/// far. The stream is finite and single-pass; reopen to restart.
pub struct ChunkStream<R> {
    reader: io::Take<R>,
    chunk_size: usize,
    consumed: u64,
    total: u64,
    observer: Arc<dyn ProgressObserver>,
    done: bool,
}

/// Chunk stream over an archive member or plain file.
pub type EntryStream = ChunkStream<Box<dyn Read + Send>>;

impl<R: Read> ChunkStream<R> {
    /// Stream at most `total` bytes from `reader`.
    pub fn new(reader: R, total: u64, chunk_size: usize) -> PackResult<Self> {
        if chunk_size == 0 {
            return Err(PackError::InvalidChunkSize);
        }
        Ok(Self {
            reader: reader.take(total),
            chunk_size,
            consumed: 0,
            total,
            observer: Arc::new(NoopProgress),
            done: false,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Declared size of the underlying entry.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.consumed as f64 * 100.0 / self.total as f64
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl EntryStream {
    /// Stream one regular-file member of an archive.
    ///
    /// `entry` is matched after normalization, so `./a.txt` and `a.txt`
    /// name the same member. Plain tar files are positioned with a seek;
    /// other sources are skipped forward from a fresh stream.
    pub fn open_entry(source: &ArchiveSource, entry: &str, chunk_size: usize) -> PackResult<Self> {
        let wanted = member_name(Path::new(entry));
        let (offset, size) = locate(source, &wanted)?;

        let reader: Box<dyn Read + Send> = match source {
            ArchiveSource::File {
                path,
                format: ArchiveFormat::Tar,
            } => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(offset))?;
                Box::new(file)
            }
            _ => {
                let mut stream = source.open()?;
                let skipped = io::copy(&mut (&mut stream).take(offset), &mut io::sink())?;
                if skipped != offset {
                    return Err(PackError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("archive ended before member {wanted}"),
                    )));
                }
                stream
            }
        };

        debug!(entry = %wanted, offset, size, "streaming archive member");
        Self::new(reader, size, chunk_size)
    }

    /// Stream a regular file from disk.
    pub fn open_file(path: &Path, chunk_size: usize) -> PackResult<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(PackError::NotAFile(path.display().to_string()));
        }
        Self::new(Box::new(file) as Box<dyn Read + Send>, metadata.len(), chunk_size)
    }
}

/// Find the data offset and size of a member in the decoded tar stream.
fn locate(source: &ArchiveSource, wanted: &str) -> PackResult<(u64, u64)> {
    let mut archive = Archive::new(source.open()?);
    for entry in archive.entries()? {
        let entry = entry?;
        if member_name(&entry.path()?) != wanted {
            continue;
        }
        if !entry.header().entry_type().is_file() {
            return Err(PackError::NotAFile(wanted.to_string()));
        }
        return Ok((entry.raw_file_position(), entry.size()));
    }
    Err(PackError::EntryNotFound(wanted.to_string()))
}

impl<R: Read> Iterator for ChunkStream<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        let filled = match self.fill(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if filled == 0 {
            self.done = true;
            if self.consumed < self.total {
                return Some(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended at {} of {} bytes", self.consumed, self.total),
                )));
            }
            if self.total == 0 {
                self.observer.on_progress(self.percent());
            }
            return None;
        }

        buf.truncate(filled);
        self.consumed += filled as u64;
        self.observer.on_progress(self.percent());
        Some(Ok(buf))
    }
}
