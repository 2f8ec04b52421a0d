//! Streaming paired-buffer comparison.
//!
//! Each side is pumped on its own blocking task into a one-slot channel. The
//! comparison loop pulls from a side only while that side's queue is empty,
//! compares the shared prefix of the two queues, and consumes it. Chunk
//! boundaries on the two sides are unrelated, so comparison works on the
//! shorter of the two queued runs, never on whole chunks.
//!
//! On the first differing byte, or the first failure, both pumps are told to
//! stop and both streams are aborted before returning.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{both, on_side, Failure, Side, Verdict};
use crate::cancel::{CancelGuard, CancelToken};
use crate::error::ReadError;
use crate::reader::{ChunkStream, Reader};

type PumpItem = Result<Option<Vec<u8>>, ReadError>;

/// Append-only byte queue made of received chunks, consumed from the front.
#[derive(Debug, Default)]
pub struct ByteQueue {
    chunks: VecDeque<Vec<u8>>,
    /// Bytes of the front chunk already consumed.
    head: usize,
    len: usize,
}

impl ByteQueue {
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unconsumed remainder of the front chunk.
    pub fn front(&self) -> &[u8] {
        self.chunks
            .front()
            .map(|c| &c[self.head..])
            .unwrap_or(&[])
    }

    /// Drop `n` bytes from the front. `n` must not exceed `front().len()`.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.front().len());
        self.head += n;
        self.len -= n;
        if let Some(front) = self.chunks.front() {
            if self.head == front.len() {
                self.chunks.pop_front();
                self.head = 0;
            }
        }
    }
}

/// Counters from one paired comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairStats {
    /// Bytes found equal on both sides before the loop stopped.
    pub matched: u64,
    /// Largest number of received but not yet compared bytes held at once (both sides).
    pub peak_buffered: usize,
}

/// Stream both sides and compare as bytes arrive; stop at the first difference.
pub async fn stream_compare(a: Arc<dyn Reader>, b: Arc<dyn Reader>) -> Verdict {
    compare_with_stats(a, b).await.0
}

pub(crate) async fn compare_with_stats(
    a: Arc<dyn Reader>,
    b: Arc<dyn Reader>,
) -> (Verdict, PairStats) {
    let (sa, sb) = tokio::join!(
        on_side(Side::A, &a, |r| r.open_stream()),
        on_side(Side::B, &b, |r| r.open_stream()),
    );
    let (sa, sb) = match both(sa, sb) {
        Ok(pair) => pair,
        Err(f) => return (Verdict::Failed(f), PairStats::default()),
    };

    let stop = CancelToken::new();
    let mut guard = CancelGuard::new();
    guard.watch(stop.clone());
    guard.watch(sa.abort_handle());
    guard.watch(sb.abort_handle());

    let (tx_a, mut rx_a) = mpsc::channel::<PumpItem>(1);
    let (tx_b, mut rx_b) = mpsc::channel::<PumpItem>(1);
    let pump_a = tokio::task::spawn_blocking({
        let stop = stop.clone();
        move || pump(sa, tx_a, stop)
    });
    let pump_b = tokio::task::spawn_blocking({
        let stop = stop.clone();
        move || pump(sb, tx_b, stop)
    });

    let mut stats = PairStats::default();
    let verdict = drive(&mut rx_a, &mut rx_b, &mut stats).await;

    guard.cancel_all();
    drop(rx_a);
    drop(rx_b);
    // Streams are dropped inside the pumps; wait so no file or socket outlives this call.
    let (ja, jb) = tokio::join!(pump_a, pump_b);
    for (side, joined) in [(Side::A, ja), (Side::B, jb)] {
        if let Err(e) = joined {
            tracing::warn!(%side, error = %e, "stream pump task failed");
        }
    }
    (verdict, stats)
}

/// Pull chunks until the end marker, an error, or `stop`. The stream drops on return.
fn pump(mut stream: ChunkStream, tx: mpsc::Sender<PumpItem>, stop: CancelToken) {
    loop {
        if stop.is_cancelled() {
            return;
        }
        let item = stream.next_chunk();
        let last = !matches!(item, Ok(Some(_)));
        if tx.blocking_send(item).is_err() || last {
            return;
        }
    }
}

/// Feed one received item into `queue`. Returns true once the side has ended.
fn absorb(side: Side, item: Option<PumpItem>, queue: &mut ByteQueue) -> Result<bool, Failure> {
    match item {
        Some(Ok(Some(chunk))) => {
            queue.push(chunk);
            Ok(false)
        }
        Some(Ok(None)) => Ok(true),
        Some(Err(e)) => Err(Failure::new(side, e)),
        None => Err(Failure::new(
            side,
            ReadError::InvalidState("stream pump stopped without an end marker".to_string()),
        )),
    }
}

async fn drive(
    rx_a: &mut mpsc::Receiver<PumpItem>,
    rx_b: &mut mpsc::Receiver<PumpItem>,
    stats: &mut PairStats,
) -> Verdict {
    let mut qa = ByteQueue::default();
    let mut qb = ByteQueue::default();
    let mut done_a = false;
    let mut done_b = false;

    loop {
        stats.peak_buffered = stats.peak_buffered.max(qa.len() + qb.len());

        while !qa.is_empty() && !qb.is_empty() {
            let fa = qa.front();
            let fb = qb.front();
            let n = fa.len().min(fb.len());
            if fa[..n] != fb[..n] {
                let at = fa[..n]
                    .iter()
                    .zip(&fb[..n])
                    .position(|(x, y)| x != y)
                    .unwrap_or(0);
                tracing::debug!(offset = stats.matched + at as u64, "first differing byte");
                return Verdict::NotEqual;
            }
            qa.consume(n);
            qb.consume(n);
            stats.matched += n as u64;
        }

        if done_a && done_b {
            return if qa.is_empty() && qb.is_empty() {
                Verdict::Equal
            } else {
                Verdict::NotEqual
            };
        }
        // One side ended with nothing left while the other still holds bytes.
        if (done_a && qa.is_empty() && !qb.is_empty()) || (done_b && qb.is_empty() && !qa.is_empty()) {
            tracing::debug!(matched = stats.matched, "length mismatch");
            return Verdict::NotEqual;
        }

        let need_a = qa.is_empty() && !done_a;
        let need_b = qb.is_empty() && !done_b;
        tokio::select! {
            item = rx_a.recv(), if need_a => match absorb(Side::A, item, &mut qa) {
                Ok(ended) => done_a = ended,
                Err(f) => return Verdict::Failed(f),
            },
            item = rx_b.recv(), if need_b => match absorb(Side::B, item, &mut qb) {
                Ok(ended) => done_b = ended,
                Err(f) => return Verdict::Failed(f),
            },
            else => {
                return Verdict::Failed(Failure::new(
                    Side::A,
                    ReadError::InvalidState("comparison loop has nothing to wait on".to_string()),
                ));
            }
        }
    }
}
