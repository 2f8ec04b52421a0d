//! One-shot chunk streams.

use crate::cancel::CancelToken;
use crate::error::ReadError;

/// Producer behind a `ChunkStream`. `Ok(None)` marks the end of the resource.
pub trait ChunkSource: Send {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError>;
}

/// Adapter so any iterator of chunk results can back a stream (used by tests and callers
/// that already hold data).
struct IterSource<I>(I);

impl<I> ChunkSource for IterSource<I>
where
    I: Iterator<Item = Result<Vec<u8>, ReadError>> + Send,
{
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        self.0.next().transpose()
    }
}

/// Lazy, finite, non-restartable sequence of byte chunks.
///
/// After the source reports its end or an error, the source is dropped at once
/// and further pulls fail with `InvalidState`. The abort handle lets another task
/// stop a transfer that is blocked waiting for data.
pub struct ChunkStream {
    source: Option<Box<dyn ChunkSource>>,
    abort: CancelToken,
    pulled_bytes: u64,
}

impl ChunkStream {
    pub fn new(source: impl ChunkSource + 'static) -> Self {
        Self::with_abort(source, CancelToken::new())
    }

    /// Build a stream whose source observes `abort` (e.g. a transfer thread).
    pub fn with_abort(source: impl ChunkSource + 'static, abort: CancelToken) -> Self {
        Self {
            source: Some(Box::new(source)),
            abort,
            pulled_bytes: 0,
        }
    }

    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<u8>, ReadError>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(IterSource(chunks.into_iter()))
    }

    pub fn abort_handle(&self) -> CancelToken {
        self.abort.clone()
    }

    /// Bytes delivered so far.
    pub fn pulled_bytes(&self) -> u64 {
        self.pulled_bytes
    }

    pub fn is_terminated(&self) -> bool {
        self.source.is_none()
    }

    /// Next chunk, `Ok(None)` at the end. Zero-length chunks may occur.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        if self.abort.is_cancelled() {
            self.source = None;
        }
        let source = self.source.as_mut().ok_or_else(|| {
            ReadError::InvalidState("stream already consumed or aborted".to_string())
        })?;
        match source.next_chunk() {
            Ok(Some(chunk)) => {
                self.pulled_bytes += chunk.len() as u64;
                Ok(Some(chunk))
            }
            other => {
                self.source = None;
                other
            }
        }
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        self.abort.cancel();
    }
}

impl Iterator for ChunkStream {
    type Item = Result<Vec<u8>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.source.is_none() {
            return None;
        }
        self.next_chunk().transpose()
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("terminated", &self.is_terminated())
            .field("pulled_bytes", &self.pulled_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadErrorKind;

    #[test]
    fn yields_chunks_then_end() {
        let mut s = ChunkStream::from_chunks(vec![Ok(b"ab".to_vec()), Ok(b"c".to_vec())]);
        assert_eq!(s.next_chunk().unwrap(), Some(b"ab".to_vec()));
        assert_eq!(s.next_chunk().unwrap(), Some(b"c".to_vec()));
        assert_eq!(s.next_chunk().unwrap(), None);
        assert!(s.is_terminated());
        assert_eq!(s.pulled_bytes(), 3);
    }

    #[test]
    fn pull_after_end_is_invalid_state() {
        let mut s = ChunkStream::from_chunks(Vec::new());
        assert_eq!(s.next_chunk().unwrap(), None);
        assert_eq!(s.next_chunk().unwrap_err().kind(), ReadErrorKind::InvalidState);
    }

    #[test]
    fn error_is_terminal() {
        let mut s = ChunkStream::from_chunks(vec![
            Err(ReadError::Unreachable("reset".into())),
            Ok(b"never".to_vec()),
        ]);
        assert_eq!(s.next_chunk().unwrap_err().kind(), ReadErrorKind::Unreachable);
        assert_eq!(s.next_chunk().unwrap_err().kind(), ReadErrorKind::InvalidState);
    }

    #[test]
    fn iterator_is_fused_after_end() {
        let s = ChunkStream::from_chunks(vec![Ok(vec![1]), Ok(vec![2, 3])]);
        let all: Vec<u8> = s.map(|c| c.unwrap()).flatten().collect();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn aborted_stream_stops() {
        let mut s = ChunkStream::from_chunks(vec![Ok(vec![1]), Ok(vec![2])]);
        s.abort_handle().cancel();
        assert_eq!(s.next_chunk().unwrap_err().kind(), ReadErrorKind::InvalidState);
    }
}
