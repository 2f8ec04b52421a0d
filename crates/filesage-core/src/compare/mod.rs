//! Equivalence strategies.
//!
//! Each strategy takes two readers (or one reader plus an expected value) and
//! returns a `Verdict`. None of them retry, and none turn a read failure into
//! `NotEqual`: `NotEqual` is proven difference, `Inconclusive` is insufficient
//! evidence, `Failed` means the comparison could not be evaluated.

mod metadata;
mod paired;
mod partial;
mod stream_hash;
mod whole;

pub use metadata::{fingerprint_check, size_check};
pub use paired::{stream_compare, ByteQueue, PairStats};
pub use partial::{partial_hash, DEFAULT_PARTIAL_SAMPLE};
pub use stream_hash::stream_hash;
pub use whole::{whole_hash, whole_read};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ReadError, ReadErrorKind};
use crate::handle::{normalize_fingerprint, FileHandle};
use crate::reader::{self, HttpOptions, Reader, DEFAULT_CHUNK_SIZE};

/// Which side of a comparison a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// A read failure attributed to one side.
#[derive(Debug)]
pub struct Failure {
    pub side: Side,
    pub error: ReadError,
}

impl Failure {
    pub fn new(side: Side, error: ReadError) -> Self {
        Self { side, error }
    }

    pub fn kind(&self) -> ReadErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "side {}: {}", self.side, self.error)
    }
}

/// Outcome of one comparison.
#[derive(Debug)]
pub enum Verdict {
    Equal,
    NotEqual,
    /// The evidence gathered rules out neither equality nor inequality.
    Inconclusive(String),
    Failed(Failure),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Equal => "equal",
            Verdict::NotEqual => "not-equal",
            Verdict::Inconclusive(_) => "inconclusive",
            Verdict::Failed(_) => "failed",
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, Verdict::Equal)
    }

    pub fn is_not_equal(&self) -> bool {
        matches!(self, Verdict::NotEqual)
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Verdict::Inconclusive(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Verdict::Failed(f) => Some(f),
            _ => None,
        }
    }
}

impl From<Failure> for Verdict {
    fn from(f: Failure) -> Self {
        Verdict::Failed(f)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Equal | Verdict::NotEqual => f.write_str(self.label()),
            Verdict::Inconclusive(reason) => write!(f, "inconclusive ({})", reason),
            Verdict::Failed(failure) => write!(
                f,
                "failed [{}] {}",
                failure.kind(),
                failure
            ),
        }
    }
}

/// The closed set of strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Compare A's size against an expected size.
    SizeCheck,
    /// Compare A's fingerprint (ETag) against an expected token.
    FingerprintCheck,
    /// Read both sides fully and compare bytes.
    WholeRead,
    /// Read both sides fully and compare digests.
    WholeHash,
    /// Pull both sides as streams and compare as bytes arrive.
    StreamCompare,
    /// Digest the first and last K bytes of each side via range reads.
    PartialHash,
    /// Digest both sides as streams, concurrently.
    StreamHash,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::SizeCheck,
        Strategy::FingerprintCheck,
        Strategy::PartialHash,
        Strategy::StreamHash,
        Strategy::StreamCompare,
        Strategy::WholeRead,
        Strategy::WholeHash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SizeCheck => "content-length",
            Strategy::FingerprintCheck => "etag",
            Strategy::WholeRead => "download-buffer",
            Strategy::WholeHash => "download-hash",
            Strategy::StreamCompare => "stream-buffer-compare",
            Strategy::PartialHash => "partial-hash",
            Strategy::StreamHash => "stream-hash",
        }
    }

    /// Strategies whose match only yields `Inconclusive` unless explicitly trusted.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Strategy::SizeCheck | Strategy::FingerprintCheck | Strategy::PartialHash
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for Strategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|st| st.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.name()).collect();
                format!("unknown strategy {:?} (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Runtime knobs for strategy execution.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Chunk size for local streams.
    pub chunk_size: usize,
    /// K for partial-hash: bytes sampled at each end.
    pub partial_sample_bytes: u64,
    /// Treat a fingerprint match as `Equal`.
    pub trust_fingerprint: bool,
    /// Treat a head/tail digest match as `Equal`.
    pub trust_partial_hash: bool,
    pub http: HttpOptions,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            partial_sample_bytes: DEFAULT_PARTIAL_SAMPLE,
            trust_fingerprint: false,
            trust_partial_hash: false,
            http: HttpOptions::default(),
        }
    }
}

/// Two opened sides plus whatever is already known about B.
#[derive(Clone)]
pub struct Pair {
    pub a: Arc<dyn Reader>,
    pub b: Arc<dyn Reader>,
    /// Expected size for size-check; probed from B when `None`.
    pub expected_size: Option<u64>,
    /// Expected fingerprint for fingerprint-check; probed from B when `None`.
    pub expected_fingerprint: Option<String>,
}

impl Pair {
    pub fn new(a: Arc<dyn Reader>, b: Arc<dyn Reader>) -> Self {
        Self {
            a,
            b,
            expected_size: None,
            expected_fingerprint: None,
        }
    }

    /// Open readers for two handles; B's known metadata becomes the expectation.
    pub fn from_handles(a: &FileHandle, b: &FileHandle, opts: &CompareOptions) -> Self {
        Self {
            a: reader::open(a, opts.chunk_size, &opts.http),
            b: reader::open(b, opts.chunk_size, &opts.http),
            expected_size: b.known_size(),
            expected_fingerprint: b.known_fingerprint().map(str::to_string),
        }
    }
}

/// Run `strategy` on two handles.
pub async fn compare(
    strategy: Strategy,
    a: &FileHandle,
    b: &FileHandle,
    opts: &CompareOptions,
) -> Verdict {
    let pair = Pair::from_handles(a, b, opts);
    run(strategy, &pair, opts).await
}

/// Run `strategy` on an opened pair.
pub async fn run(strategy: Strategy, pair: &Pair, opts: &CompareOptions) -> Verdict {
    let start = Instant::now();
    tracing::debug!(%strategy, a = %pair.a.describe(), b = %pair.b.describe(), "comparison start");
    let verdict = match strategy {
        Strategy::SizeCheck => {
            let expected = match pair.expected_size {
                Some(n) => Ok(n),
                None => on_side(Side::B, &pair.b, |r| r.size()).await,
            };
            match expected {
                Ok(n) => size_check(Arc::clone(&pair.a), n).await,
                Err(f) => Verdict::Failed(f),
            }
        }
        Strategy::FingerprintCheck => {
            let expected = match &pair.expected_fingerprint {
                Some(tag) => Ok(Some(normalize_fingerprint(tag))),
                None => on_side(Side::B, &pair.b, |r| r.metadata())
                    .await
                    .map(|m| m.fingerprint),
            };
            match expected {
                Ok(Some(tag)) => {
                    fingerprint_check(Arc::clone(&pair.a), &tag, opts.trust_fingerprint).await
                }
                Ok(None) => Verdict::Inconclusive("no expected fingerprint available".to_string()),
                Err(f) => Verdict::Failed(f),
            }
        }
        Strategy::WholeRead => whole_read(Arc::clone(&pair.a), Arc::clone(&pair.b)).await,
        Strategy::WholeHash => whole_hash(Arc::clone(&pair.a), Arc::clone(&pair.b)).await,
        Strategy::StreamCompare => {
            stream_compare(Arc::clone(&pair.a), Arc::clone(&pair.b)).await
        }
        Strategy::PartialHash => {
            partial_hash(
                Arc::clone(&pair.a),
                Arc::clone(&pair.b),
                opts.partial_sample_bytes,
                opts.trust_partial_hash,
            )
            .await
        }
        Strategy::StreamHash => stream_hash(Arc::clone(&pair.a), Arc::clone(&pair.b)).await,
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match &verdict {
        Verdict::Failed(f) => {
            tracing::warn!(%strategy, side = %f.side, kind = %f.kind(), error = %f.error, elapsed_ms, "comparison failed")
        }
        v => tracing::info!(%strategy, verdict = v.label(), elapsed_ms, "comparison done"),
    }
    verdict
}

/// Run a blocking reader operation for `side` on the blocking pool.
pub(crate) async fn on_side<T, F>(side: Side, reader: &Arc<dyn Reader>, f: F) -> Result<T, Failure>
where
    T: Send + 'static,
    F: FnOnce(&dyn Reader) -> Result<T, ReadError> + Send + 'static,
{
    let reader = Arc::clone(reader);
    match tokio::task::spawn_blocking(move || f(reader.as_ref())).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(error)) => Err(Failure::new(side, error)),
        Err(join) => Err(Failure::new(
            side,
            ReadError::InvalidState(format!("reader task failed: {}", join)),
        )),
    }
}

/// Combine two side results, reporting A's failure first when both failed.
pub(crate) fn both<T, U>(a: Result<T, Failure>, b: Result<U, Failure>) -> Result<(T, U), Failure> {
    Ok((a?, b?))
}

#[cfg(test)]
pub(crate) mod testutil;
