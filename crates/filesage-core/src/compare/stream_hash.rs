//! Concurrent streamed digests.

use std::sync::Arc;

use super::{both, on_side, Failure, Side, Verdict};
use crate::cancel::{CancelGuard, CancelToken};
use crate::digest::{Accumulator, Digest};
use crate::error::ReadError;
use crate::reader::{ChunkStream, Reader};

/// Outcome of hashing one side. `Err(None)` means the side stopped because its peer failed.
type SideDigest = Result<Digest, Option<ReadError>>;

/// Hash both sides as streams, concurrently, and compare the digests.
///
/// When one side fails, the other is aborted and the first failure is reported.
/// Equal digests are reported as `Equal` on the strength of SHA-256.
pub async fn stream_hash(a: Arc<dyn Reader>, b: Arc<dyn Reader>) -> Verdict {
    let (sa, sb) = tokio::join!(
        on_side(Side::A, &a, |r| r.open_stream()),
        on_side(Side::B, &b, |r| r.open_stream()),
    );
    let (sa, sb) = match both(sa, sb) {
        Ok(pair) => pair,
        Err(f) => return Verdict::Failed(f),
    };

    let stop = CancelToken::new();
    let group = vec![stop.clone(), sa.abort_handle(), sb.abort_handle()];
    let mut guard = CancelGuard::new();
    for t in &group {
        guard.watch(t.clone());
    }

    let task_a = tokio::task::spawn_blocking({
        let group = group.clone();
        move || digest_stream(sa, &group)
    });
    let task_b = tokio::task::spawn_blocking(move || digest_stream(sb, &group));
    let (ra, rb) = tokio::join!(task_a, task_b);
    drop(guard);

    let ra = flatten(ra);
    let rb = flatten(rb);
    match (ra, rb) {
        (Ok(da), Ok(db)) if da == db => Verdict::Equal,
        (Ok(da), Ok(db)) => {
            tracing::debug!(digest_a = %da, digest_b = %db, "stream digests differ");
            Verdict::NotEqual
        }
        (Err(Some(e)), _) => Verdict::Failed(Failure::new(Side::A, e)),
        (_, Err(Some(e))) => Verdict::Failed(Failure::new(Side::B, e)),
        (ra, _) => {
            let side = if ra.is_err() { Side::A } else { Side::B };
            Verdict::Failed(Failure::new(
                side,
                ReadError::InvalidState("stream stopped without a cause".to_string()),
            ))
        }
    }
}

/// `group[0]` is the shared stop flag; the rest are stream abort handles.
fn digest_stream(mut stream: ChunkStream, group: &[CancelToken]) -> SideDigest {
    let stop = &group[0];
    let mut acc = Accumulator::new();
    loop {
        if stop.is_cancelled() {
            return Err(None);
        }
        match stream.next_chunk() {
            Ok(Some(chunk)) => acc.update(&chunk).map_err(Some)?,
            Ok(None) => return acc.finalize().map_err(Some),
            Err(_) if stop.is_cancelled() => return Err(None),
            Err(e) => {
                for t in group {
                    t.cancel();
                }
                return Err(Some(e));
            }
        }
    }
}

fn flatten(joined: Result<SideDigest, tokio::task::JoinError>) -> SideDigest {
    joined.unwrap_or_else(|e| Err(Some(ReadError::InvalidState(format!("hash task failed: {}", e)))))
}
