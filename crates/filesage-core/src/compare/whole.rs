//! Whole-resource strategies: buffer both sides, or hash both sides.

use std::sync::Arc;

use super::{both, on_side, Side, Verdict};
use crate::digest;
use crate::reader::Reader;

/// `read_all` both sides concurrently and compare bytes. Holds both bodies in memory.
pub async fn whole_read(a: Arc<dyn Reader>, b: Arc<dyn Reader>) -> Verdict {
    let (ra, rb) = tokio::join!(
        on_side(Side::A, &a, |r| r.read_all()),
        on_side(Side::B, &b, |r| r.read_all()),
    );
    match both(ra, rb) {
        Ok((da, db)) if da == db => Verdict::Equal,
        Ok((da, db)) => {
            tracing::debug!(len_a = da.len(), len_b = db.len(), "buffers differ");
            Verdict::NotEqual
        }
        Err(f) => Verdict::Failed(f),
    }
}

/// SHA-256 over `read_all` of each side. Each body is dropped as soon as it is hashed.
///
/// Equal digests are reported as `Equal`: this relies on SHA-256 collision
/// resistance rather than proving byte equality.
pub async fn whole_hash(a: Arc<dyn Reader>, b: Arc<dyn Reader>) -> Verdict {
    let (ra, rb) = tokio::join!(
        on_side(Side::A, &a, |r| r.read_all().map(|body| digest::of_bytes(&body))),
        on_side(Side::B, &b, |r| r.read_all().map(|body| digest::of_bytes(&body))),
    );
    match both(ra, rb) {
        Ok((da, db)) if da == db => Verdict::Equal,
        Ok((da, db)) => {
            tracing::debug!(digest_a = %da, digest_b = %db, "digests differ");
            Verdict::NotEqual
        }
        Err(f) => Verdict::Failed(f),
    }
}
