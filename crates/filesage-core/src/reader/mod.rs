//! Uniform read capabilities over local files and HTTP resources.
//!
//! Strategies only talk to `Reader`; `open` picks the implementation for a
//! `FileHandle`. All methods block; async callers run them under
//! `spawn_blocking`.

mod local;
mod remote;
mod stream;

pub use local::LocalReader;
pub use remote::{HttpOptions, RemoteReader};
pub use stream::{ChunkSource, ChunkStream};

use crate::error::ReadError;
use crate::handle::{FileHandle, Origin, Range};
use std::sync::Arc;

/// Default chunk size for local streams.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Size and optional content fingerprint (ETag) of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    /// Normalized fingerprint (weak marker and quotes stripped), if the source has one.
    pub fingerprint: Option<String>,
}

/// Read capabilities shared by every source.
pub trait Reader: Send + Sync {
    /// Human-readable location for logs and failure reports.
    fn describe(&self) -> String;

    /// Metadata-only probe. Never transfers the body.
    fn metadata(&self) -> Result<Metadata, ReadError>;

    fn size(&self) -> Result<u64, ReadError> {
        Ok(self.metadata()?.size)
    }

    fn read_all(&self) -> Result<Vec<u8>, ReadError>;

    /// Exactly `range.len()` bytes starting at `range.start`.
    fn read_range(&self, range: Range) -> Result<Vec<u8>, ReadError>;

    /// Lazy, one-shot chunk sequence over the whole resource.
    fn open_stream(&self) -> Result<ChunkStream, ReadError>;
}

/// Open the reader for `handle`.
pub fn open(handle: &FileHandle, chunk_size: usize, http: &HttpOptions) -> Arc<dyn Reader> {
    match handle.origin() {
        Origin::Local(path) => Arc::new(LocalReader::new(path.clone(), chunk_size)),
        Origin::Remote(url) => Arc::new(RemoteReader::new(url.as_str(), http.clone())),
    }
}
