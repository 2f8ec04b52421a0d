//! Head/tail sampling strategy.

use std::sync::Arc;

use super::{both, on_side, Failure, Side, Verdict};
use crate::digest::{self, Accumulator, Digest};
use crate::error::ReadError;
use crate::handle::Range;
use crate::reader::Reader;

/// Bytes sampled at each end when nothing else is configured.
pub const DEFAULT_PARTIAL_SAMPLE: u64 = 64 * 1024;

/// Compare sizes, then digests of the first and last `k` bytes of each side.
///
/// Differing sizes or samples prove difference. Matching samples say nothing
/// about the middle, so they give `Inconclusive` unless `trust` is set.
pub async fn partial_hash(a: Arc<dyn Reader>, b: Arc<dyn Reader>, k: u64, trust: bool) -> Verdict {
    let (sa, sb) = tokio::join!(
        on_side(Side::A, &a, |r| r.size()),
        on_side(Side::B, &b, |r| r.size()),
    );
    let (size_a, size_b) = match both(sa, sb) {
        Ok(sizes) => sizes,
        Err(f) => return Verdict::Failed(f),
    };
    if size_a != size_b {
        tracing::debug!(size_a, size_b, "sizes differ, skipping samples");
        return Verdict::NotEqual;
    }

    let (da, db) = tokio::join!(
        sample_digest(Side::A, &a, size_a, k),
        sample_digest(Side::B, &b, size_b, k),
    );
    match both(da, db) {
        Ok((da, db)) if da != db => {
            tracing::debug!(digest_a = %da, digest_b = %db, k, "sample digests differ");
            Verdict::NotEqual
        }
        Ok(_) if trust => Verdict::Equal,
        Ok(_) => Verdict::Inconclusive(format!(
            "first and last {} bytes match; middle not compared",
            k.min(size_a)
        )),
        Err(f) => Verdict::Failed(f),
    }
}

/// SHA-256 over head || tail of one side. Head and tail are fetched concurrently;
/// when they are the same window (`size <= k`) it is fetched once and hashed twice.
async fn sample_digest(
    side: Side,
    reader: &Arc<dyn Reader>,
    size: u64,
    k: u64,
) -> Result<Digest, Failure> {
    let (head, tail) = match (Range::head(size, k), Range::tail(size, k)) {
        (Some(head), Some(tail)) => (head, tail),
        _ => return Ok(digest::of_bytes(&[])),
    };
    let (head_bytes, tail_bytes) = if head == tail {
        let bytes = read_window(side, reader, head).await?;
        (bytes.clone(), bytes)
    } else {
        let (h, t) = tokio::join!(
            read_window(side, reader, head),
            read_window(side, reader, tail),
        );
        (h?, t?)
    };
    hash_windows(&head_bytes, &tail_bytes).map_err(|e| Failure::new(side, e))
}

fn hash_windows(head: &[u8], tail: &[u8]) -> Result<Digest, ReadError> {
    let mut acc = Accumulator::new();
    acc.update(head)?;
    acc.update(tail)?;
    acc.finalize()
}

/// One range read, rejecting answers of the wrong length.
async fn read_window(side: Side, reader: &Arc<dyn Reader>, range: Range) -> Result<Vec<u8>, Failure> {
    on_side(side, reader, move |r| {
        let bytes = r.read_range(range)?;
        if bytes.len() as u64 != range.len() {
            return Err(ReadError::ProtocolViolation(format!(
                "range {} returned {} bytes, expected {}",
                range.http_spec(),
                bytes.len(),
                range.len()
            )));
        }
        Ok(bytes)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::testutil::{pattern, MockReader};
    use crate::compare::{stream_compare, whole_read};
    use crate::error::ReadErrorKind;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test]
    async fn different_sizes_skip_range_reads() {
        let a = MockReader::new(pattern(100));
        let counters = Arc::clone(&a.counters);
        let b = MockReader::new(pattern(101)).arc();
        assert!(partial_hash(a.arc(), b, 16, false).await.is_not_equal());
        assert_eq!(counters.ranges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn differing_tail_is_not_equal() {
        let data = pattern(10_000);
        let mut other = data.clone();
        other[9_999] ^= 1;
        let a = MockReader::new(data).arc();
        let b = MockReader::new(other).arc();
        assert!(partial_hash(a, b, 1024, false).await.is_not_equal());
    }

    #[tokio::test]
    async fn differing_middle_is_missed_but_not_claimed_equal() {
        let data = pattern(10_000);
        let mut other = data.clone();
        other[5_000] ^= 1;
        let a = MockReader::new(data).arc();
        let b = MockReader::new(other).arc();

        let v = partial_hash(Arc::clone(&a), Arc::clone(&b), 1024, false).await;
        assert!(v.is_inconclusive(), "{}", v);
        assert!(stream_compare(Arc::clone(&a), Arc::clone(&b)).await.is_not_equal());
        assert!(whole_read(a, b).await.is_not_equal());
    }

    #[tokio::test]
    async fn trusted_match_is_equal() {
        let data = pattern(300);
        let a = MockReader::new(data.clone()).arc();
        let b = MockReader::new(data).arc();
        // k larger than the resource: both samples cover everything.
        assert!(partial_hash(a, b, 1024, true).await.is_equal());
    }

    #[tokio::test]
    async fn empty_resources_match() {
        let a = MockReader::new(Vec::new()).arc();
        let b = MockReader::new(Vec::new()).arc();
        assert!(partial_hash(a, b, 64, false).await.is_inconclusive());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn head_and_tail_are_read_concurrently() {
        let data = pattern(1024 * 1024);
        let a = MockReader::new(data.clone()).range_delay(Duration::from_millis(100));
        let counters = Arc::clone(&a.counters);
        let b = MockReader::new(data).arc();
        let v = partial_hash(a.arc(), b, 1024, false).await;
        assert!(v.is_inconclusive(), "{}", v);
        assert_eq!(counters.ranges.load(Ordering::SeqCst), 2);
        assert_eq!(counters.peak_ranges_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn small_resource_reads_its_window_once() {
        let data = pattern(500);
        let a = MockReader::new(data.clone());
        let counters = Arc::clone(&a.counters);
        let b = MockReader::new(data).arc();
        assert!(partial_hash(a.arc(), b, 1024, false).await.is_inconclusive());
        assert_eq!(counters.ranges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ignored_range_is_protocol_violation() {
        let data = pattern(10_000);
        let a = MockReader::new(data.clone()).arc();
        let b = MockReader::new(data).ignore_range().arc();
        let v = partial_hash(a, b, 100, true).await;
        let f = v.failure().expect("failed");
        assert_eq!(f.side, Side::B);
        assert_eq!(f.kind(), ReadErrorKind::ProtocolViolation);
    }
}
