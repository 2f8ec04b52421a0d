//! `filesage bench <A> <B>`: run every strategy and print a timing table.

use anyhow::Result;
use filesage_core::bench::{self, BenchReport};
use filesage_core::compare::{CompareOptions, Pair};
use std::time::Duration;

use crate::cli::PairArgs;

fn print_bench_report(report: &BenchReport) {
    println!(
        "  {:<22}  {:<12}  {:>10}  {}",
        "Strategy", "Verdict", "Time(ms)", "Detail"
    );
    println!(
        "  {}  {}  {}  {}",
        "----------------------", "------------", "----------", "------"
    );
    for e in &report.entries {
        let detail = match (&e.failure_kind, &e.failure_side, &e.detail) {
            (Some(kind), Some(side), Some(msg)) => format!("[{}] side {}: {}", kind, side, msg),
            (_, _, Some(msg)) => msg.clone(),
            _ => String::new(),
        };
        println!(
            "  {:<22}  {:<12}  {:>10.2}  {}",
            e.strategy.name(),
            e.verdict,
            e.elapsed_ms,
            detail
        );
    }
}

pub async fn run_bench(
    pair: &PairArgs,
    opts: &CompareOptions,
    timeout_secs: Option<u64>,
    json: bool,
) -> Result<i32> {
    let (a, b) = pair.handles()?;
    let pair = Pair::from_handles(&a, &b, opts);
    let report = bench::run_all(&pair, opts, timeout_secs.map(Duration::from_secs)).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }
    print_bench_report(&report);
    if let Some(best) = report.fastest_conclusive() {
        println!(
            "Fastest conclusive strategy: {} ({:.2} ms)",
            best.strategy, best.elapsed_ms
        );
    }
    if report.has_disagreement() {
        println!("Warning: strategies disagree");
    }
    Ok(0)
}
