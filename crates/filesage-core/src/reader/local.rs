//! Local filesystem reader: stat, whole read, positional range read, chunked stream.

use super::{ChunkSource, ChunkStream, Metadata, Reader};
use crate::error::ReadError;
use crate::handle::Range;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::fs::FileExt;

#[derive(Debug, Clone)]
pub struct LocalReader {
    path: PathBuf,
    chunk_size: usize,
}

impl LocalReader {
    pub fn new(path: PathBuf, chunk_size: usize) -> Self {
        Self {
            path,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: io::Error) -> ReadError {
        ReadError::from_io(&self.path, e)
    }

    fn open_file(&self) -> Result<File, ReadError> {
        let file = File::open(&self.path).map_err(|e| self.io_err(e))?;
        let meta = file.metadata().map_err(|e| self.io_err(e))?;
        if meta.is_dir() {
            return Err(ReadError::Io {
                path: self.path.display().to_string(),
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            });
        }
        Ok(file)
    }
}

impl Reader for LocalReader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn metadata(&self) -> Result<Metadata, ReadError> {
        let meta = fs::metadata(&self.path).map_err(|e| self.io_err(e))?;
        if meta.is_dir() {
            return Err(ReadError::Io {
                path: self.path.display().to_string(),
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            });
        }
        Ok(Metadata {
            size: meta.len(),
            fingerprint: None,
        })
    }

    fn read_all(&self) -> Result<Vec<u8>, ReadError> {
        let mut file = self.open_file()?;
        let mut out = Vec::new();
        file.read_to_end(&mut out).map_err(|e| self.io_err(e))?;
        Ok(out)
    }

    fn read_range(&self, range: Range) -> Result<Vec<u8>, ReadError> {
        let file = self.open_file()?;
        let size = file.metadata().map_err(|e| self.io_err(e))?.len();
        let range = Range::checked(range.start, range.end, size)?;
        let mut buf = vec![0u8; range.len() as usize];
        read_exact_at(&file, &mut buf, range.start).map_err(|e| self.io_err(e))?;
        tracing::trace!(path = %self.path.display(), start = range.start, end = range.end, "local range read");
        Ok(buf)
    }

    fn open_stream(&self) -> Result<ChunkStream, ReadError> {
        let file = self.open_file()?;
        Ok(ChunkStream::new(LocalStream {
            file,
            path: self.path.clone(),
            chunk_size: self.chunk_size,
        }))
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    file.read_exact_at(buf, offset)
}

#[cfg(not(unix))]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::io::{Seek, SeekFrom};
    let mut f = file.try_clone()?;
    f.seek(SeekFrom::Start(offset))?;
    f.read_exact(buf)
}

/// Sequential fixed-size reads; the file closes when the stream ends or is dropped.
struct LocalStream {
    file: File,
    path: PathBuf,
    chunk_size: usize,
}

impl ChunkSource for LocalStream {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::from_io(&self.path, e)),
            }
        }
    }
}
