//! Timing harness: run every strategy on one pair and report verdict and latency.
//!
//! Strategies run one after another so timings do not interfere. An optional
//! deadline bounds each run; a run that does not return in time is reported
//! as `Failed(Unreachable)`.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::compare::{self, CompareOptions, Failure, Pair, Side, Strategy, Verdict};
use crate::error::{ReadError, ReadErrorKind};

/// Result of one strategy run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchEntry {
    pub strategy: Strategy,
    /// `equal`, `not-equal`, `inconclusive` or `failed`.
    pub verdict: &'static str,
    /// Inconclusive reason or failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<ReadErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_side: Option<Side>,
    pub elapsed_ms: f64,
}

impl BenchEntry {
    pub fn new(strategy: Strategy, verdict: &Verdict, elapsed: Duration) -> Self {
        let (detail, failure_kind, failure_side) = match verdict {
            Verdict::Inconclusive(reason) => (Some(reason.clone()), None, None),
            Verdict::Failed(f) => (Some(f.error.to_string()), Some(f.kind()), Some(f.side)),
            _ => (None, None, None),
        };
        Self {
            strategy,
            verdict: verdict.label(),
            detail,
            failure_kind,
            failure_side,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Equal or NotEqual.
    pub fn is_conclusive(&self) -> bool {
        matches!(self.verdict, "equal" | "not-equal")
    }
}

/// One entry per strategy, in `Strategy::ALL` order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchReport {
    pub entries: Vec<BenchEntry>,
}

impl BenchReport {
    pub fn get(&self, strategy: Strategy) -> Option<&BenchEntry> {
        self.entries.iter().find(|e| e.strategy == strategy)
    }

    /// Fastest strategy that reached a conclusive verdict.
    pub fn fastest_conclusive(&self) -> Option<&BenchEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_conclusive())
            .min_by(|a, b| {
                a.elapsed_ms
                    .partial_cmp(&b.elapsed_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// True when the conclusive entries disagree (some equal, some not-equal).
    pub fn has_disagreement(&self) -> bool {
        let mut conclusive = self.entries.iter().filter(|e| e.is_conclusive());
        match conclusive.next() {
            Some(first) => conclusive.any(|e| e.verdict != first.verdict),
            None => false,
        }
    }
}

/// Await `fut`, or give up after `limit` and report the comparison as unreachable.
///
/// Dropping the comparison future releases its cancel guards, so streams it
/// started are aborted.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Verdict
where
    F: Future<Output = Verdict>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(v) => v,
        Err(_) => Verdict::Failed(Failure::new(
            Side::A,
            ReadError::Unreachable(format!("no verdict within {:?}", limit)),
        )),
    }
}

/// Run every strategy against `pair`, sequentially.
pub async fn run_all(pair: &Pair, opts: &CompareOptions, deadline: Option<Duration>) -> BenchReport {
    let mut report = BenchReport::default();
    for strategy in Strategy::ALL {
        let start = Instant::now();
        let verdict = match deadline {
            Some(limit) => with_deadline(limit, compare::run(strategy, pair, opts)).await,
            None => compare::run(strategy, pair, opts).await,
        };
        let entry = BenchEntry::new(strategy, &verdict, start.elapsed());
        tracing::debug!(strategy = %strategy, verdict = entry.verdict, elapsed_ms = entry.elapsed_ms, "bench run");
        report.entries.push(entry);
    }
    if report.has_disagreement() {
        tracing::warn!("strategies reached contradicting verdicts");
    }
    report
}
