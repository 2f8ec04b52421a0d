//! Instrumented in-memory reader for strategy tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ReadError;
use crate::handle::Range;
use crate::reader::{ChunkSource, ChunkStream, Metadata, Reader};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    /// `next_chunk` calls that returned data.
    pub chunks: AtomicUsize,
    /// Bytes handed out by streams.
    pub streamed: AtomicUsize,
    pub read_all: AtomicUsize,
    pub ranges: AtomicUsize,
    ranges_in_flight: AtomicUsize,
    /// Most range reads observed running at the same time.
    pub peak_ranges_in_flight: AtomicUsize,
    pub metadata: AtomicUsize,
}

#[derive(Clone)]
pub(crate) struct MockReader {
    data: Arc<Vec<u8>>,
    chunk_sizes: Vec<usize>,
    /// Stream yields this error instead of its n-th chunk.
    fail_at_chunk: Option<usize>,
    /// Stream panics instead of producing its n-th chunk.
    panic_at_chunk: Option<usize>,
    fail_everything: bool,
    ignore_range: bool,
    fingerprint: Option<String>,
    range_delay: Option<Duration>,
    pub counters: Arc<Counters>,
}

impl MockReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            chunk_sizes: vec![64 * 1024],
            fail_at_chunk: None,
            panic_at_chunk: None,
            fail_everything: false,
            ignore_range: false,
            fingerprint: None,
            range_delay: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Chunk sizes are cycled; a size of 0 emits an empty chunk.
    pub fn chunks(mut self, sizes: &[usize]) -> Self {
        self.chunk_sizes = sizes.to_vec();
        self
    }

    pub fn whole_chunks(self) -> Self {
        let n = self.data.len().max(1);
        self.chunks(&[n])
    }

    pub fn fail_at_chunk(mut self, n: usize) -> Self {
        self.fail_at_chunk = Some(n);
        self
    }

    pub fn panic_at_chunk(mut self, n: usize) -> Self {
        self.panic_at_chunk = Some(n);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    /// Behave like a server that answers every range with the whole body.
    pub fn ignore_range(mut self) -> Self {
        self.ignore_range = true;
        self
    }

    pub fn fingerprint(mut self, tag: &str) -> Self {
        self.fingerprint = Some(tag.to_string());
        self
    }

    /// Hold every range read for `delay`, so overlapping reads can be observed.
    pub fn range_delay(mut self, delay: Duration) -> Self {
        self.range_delay = Some(delay);
        self
    }

    pub fn arc(self) -> Arc<dyn Reader> {
        Arc::new(self)
    }

    pub fn chunks_pulled(&self) -> usize {
        self.counters.chunks.load(Ordering::SeqCst)
    }

    pub fn bytes_streamed(&self) -> usize {
        self.counters.streamed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ReadError> {
        if self.fail_everything {
            return Err(ReadError::Unreachable("mock: connection refused".into()));
        }
        Ok(())
    }
}

impl Reader for MockReader {
    fn describe(&self) -> String {
        format!("mock({} bytes)", self.data.len())
    }

    fn metadata(&self) -> Result<Metadata, ReadError> {
        self.counters.metadata.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Metadata {
            size: self.data.len() as u64,
            fingerprint: self.fingerprint.clone(),
        })
    }

    fn read_all(&self) -> Result<Vec<u8>, ReadError> {
        self.counters.read_all.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.data.as_ref().clone())
    }

    fn read_range(&self, range: Range) -> Result<Vec<u8>, ReadError> {
        self.counters.ranges.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if let Some(delay) = self.range_delay {
            let now = self.counters.ranges_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters
                .peak_ranges_in_flight
                .fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(delay);
            self.counters.ranges_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.ignore_range {
            return Ok(self.data.as_ref().clone());
        }
        let range = Range::checked(range.start, range.end, self.data.len() as u64)?;
        Ok(self.data[range.start as usize..range.end as usize].to_vec())
    }

    fn open_stream(&self) -> Result<ChunkStream, ReadError> {
        self.check()?;
        Ok(ChunkStream::new(MockStream {
            data: Arc::clone(&self.data),
            offset: 0,
            index: 0,
            sizes: self.chunk_sizes.clone(),
            fail_at_chunk: self.fail_at_chunk,
            panic_at_chunk: self.panic_at_chunk,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockStream {
    data: Arc<Vec<u8>>,
    offset: usize,
    index: usize,
    sizes: Vec<usize>,
    fail_at_chunk: Option<usize>,
    panic_at_chunk: Option<usize>,
    counters: Arc<Counters>,
}

impl ChunkSource for MockStream {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        if Some(self.index) == self.fail_at_chunk {
            return Err(ReadError::Unreachable("mock: connection reset".into()));
        }
        if Some(self.index) == self.panic_at_chunk {
            panic!("mock: stream panicked at chunk {}", self.index);
        }
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let want = self.sizes[self.index % self.sizes.len()];
        let n = want.min(self.data.len() - self.offset);
        let chunk = self.data[self.offset..self.offset + n].to_vec();
        self.offset += n;
        self.index += 1;
        self.counters.chunks.fetch_add(1, Ordering::SeqCst);
        self.counters.streamed.fetch_add(n, Ordering::SeqCst);
        Ok(Some(chunk))
    }
}

/// Deterministic pseudo-random content.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}
