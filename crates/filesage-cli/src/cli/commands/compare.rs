//! `filesage compare <A> <B>`: run one strategy and map the verdict to an exit status.

use anyhow::Result;
use filesage_core::bench::BenchEntry;
use filesage_core::compare::{self, CompareOptions, Strategy, Verdict};
use std::time::Instant;

use crate::cli::PairArgs;

pub const EXIT_EQUAL: i32 = 0;
pub const EXIT_NOT_EQUAL: i32 = 1;
pub const EXIT_INCONCLUSIVE: i32 = 2;
pub const EXIT_FAILED: i32 = 3;

pub fn exit_code(verdict: &Verdict) -> i32 {
    match verdict {
        Verdict::Equal => EXIT_EQUAL,
        Verdict::NotEqual => EXIT_NOT_EQUAL,
        Verdict::Inconclusive(_) => EXIT_INCONCLUSIVE,
        Verdict::Failed(_) => EXIT_FAILED,
    }
}

pub async fn run_compare(
    pair: &PairArgs,
    strategy: Strategy,
    opts: &CompareOptions,
    json: bool,
) -> Result<i32> {
    let (a, b) = pair.handles()?;
    let start = Instant::now();
    let verdict = compare::compare(strategy, &a, &b, opts).await;
    if json {
        let entry = BenchEntry::new(strategy, &verdict, start.elapsed());
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("{}: {}", strategy, verdict);
    }
    Ok(exit_code(&verdict))
}
