//! Metadata-only strategies: size and fingerprint.
//!
//! Both cost one metadata call. A mismatch proves difference; a match only
//! proves consistency, so it is reported as `Inconclusive` (the fingerprint
//! check may be told to trust its source).

use std::sync::Arc;

use super::{on_side, Side, Verdict};
use crate::handle::normalize_fingerprint;
use crate::reader::Reader;

/// Compare A's size with `expected`.
pub async fn size_check(a: Arc<dyn Reader>, expected: u64) -> Verdict {
    match on_side(Side::A, &a, |r| r.size()).await {
        Err(f) => Verdict::Failed(f),
        Ok(actual) if actual != expected => {
            tracing::debug!(actual, expected, "size mismatch");
            Verdict::NotEqual
        }
        Ok(_) => Verdict::Inconclusive(format!(
            "sizes match ({} bytes); content not compared",
            expected
        )),
    }
}

/// Compare the fingerprint A reports with `expected`.
pub async fn fingerprint_check(a: Arc<dyn Reader>, expected: &str, trust: bool) -> Verdict {
    let meta = match on_side(Side::A, &a, |r| r.metadata()).await {
        Ok(m) => m,
        Err(f) => return Verdict::Failed(f),
    };
    let expected = normalize_fingerprint(expected);
    match meta.fingerprint {
        None => Verdict::Inconclusive("side A exposes no fingerprint".to_string()),
        Some(actual) if actual != expected => {
            tracing::debug!(%actual, %expected, "fingerprint mismatch");
            Verdict::NotEqual
        }
        Some(_) if trust => Verdict::Equal,
        Some(_) => Verdict::Inconclusive(
            "fingerprints match; source not trusted as collision-free".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::testutil::MockReader;
    use crate::error::ReadErrorKind;

    #[tokio::test]
    async fn size_mismatch_is_not_equal() {
        let a = MockReader::new(vec![0; 10]).arc();
        assert!(size_check(a, 11).await.is_not_equal());
    }

    #[tokio::test]
    async fn size_match_is_inconclusive() {
        let a = MockReader::new(vec![0; 10]).arc();
        assert!(size_check(a, 10).await.is_inconclusive());
    }

    #[tokio::test]
    async fn size_probe_failure_is_failed_not_unequal() {
        let a = MockReader::new(vec![0; 10]).unreachable().arc();
        let v = size_check(a, 99).await;
        let f = v.failure().expect("failed");
        assert_eq!(f.side, Side::A);
        assert_eq!(f.kind(), ReadErrorKind::Unreachable);
    }

    #[tokio::test]
    async fn fingerprint_mismatch_is_not_equal() {
        let a = MockReader::new(vec![1]).fingerprint("abc").arc();
        assert!(fingerprint_check(a, "\"abd\"", false).await.is_not_equal());
    }

    #[tokio::test]
    async fn fingerprint_match_respects_trust() {
        let a = MockReader::new(vec![1]).fingerprint("abc").arc();
        assert!(fingerprint_check(Arc::clone(&a), "W/\"abc\"", false)
            .await
            .is_inconclusive());
        assert!(fingerprint_check(a, "abc", true).await.is_equal());
    }

    #[tokio::test]
    async fn missing_fingerprint_is_inconclusive() {
        let a = MockReader::new(vec![1]).arc();
        assert!(fingerprint_check(a, "abc", true).await.is_inconclusive());
    }
}
