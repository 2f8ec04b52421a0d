//! CLI for the filesage equivalence strategies.

mod commands;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use filesage_core::compare::Strategy;
use filesage_core::config;
use filesage_core::FileHandle;
use std::path::PathBuf;

use commands::{run_bench, run_checksum, run_compare, run_completions, run_man, run_strategies};

pub use commands::EXIT_FAILED;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "filesage")]
#[command(about = "filesage: decide whether two files or URLs hold the same bytes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// The two resources under comparison plus what is already known about B.
#[derive(Debug, Args)]
pub struct PairArgs {
    /// Side A: local path or http(s) URL.
    pub a: String,
    /// Side B: local path or http(s) URL.
    pub b: String,
    /// Known size of B in bytes (skips probing B for size checks).
    #[arg(long, value_name = "BYTES")]
    pub expected_size: Option<u64>,
    /// Known fingerprint (ETag) of B.
    #[arg(long, value_name = "TAG")]
    pub expected_fingerprint: Option<String>,
}

impl PairArgs {
    pub fn handles(&self) -> Result<(FileHandle, FileHandle)> {
        let a = FileHandle::parse(&self.a).with_context(|| format!("side A: {}", self.a))?;
        let mut b = FileHandle::parse(&self.b).with_context(|| format!("side B: {}", self.b))?;
        if let Some(size) = self.expected_size {
            b = b.with_known_size(size);
        }
        if let Some(tag) = &self.expected_fingerprint {
            b = b.with_known_fingerprint(tag);
        }
        Ok((a, b))
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Compare two resources with one strategy. Exit status: 0 equal, 1 not equal, 2 inconclusive, 3 failed.
    Compare {
        #[command(flatten)]
        pair: PairArgs,
        /// Strategy name (see `filesage strategies`).
        #[arg(long, short, default_value = "stream-buffer-compare")]
        strategy: Strategy,
        /// Report a fingerprint match as equal.
        #[arg(long)]
        trust_fingerprint: bool,
        /// Report a head/tail digest match as equal.
        #[arg(long)]
        trust_partial_hash: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run every strategy on two resources and time each one.
    Bench {
        #[command(flatten)]
        pair: PairArgs,
        /// Give up on a strategy after this many seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute SHA-256 of a local file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// List strategy names.
    Strategies,

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page (roff).
    Man,
}

impl CliCommand {
    /// Parse arguments, run the command, and return the process exit status.
    pub async fn run_from_args() -> Result<i32> {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let _ = err.print();
                return Ok(usage_exit_code(&err));
            }
        };

        match cli.command {
            CliCommand::Compare {
                pair,
                strategy,
                trust_fingerprint,
                trust_partial_hash,
                json,
            } => {
                let cfg = load_config()?;
                let mut opts = cfg.compare_options();
                opts.trust_fingerprint |= trust_fingerprint;
                opts.trust_partial_hash |= trust_partial_hash;
                run_compare(&pair, strategy, &opts, json).await
            }
            CliCommand::Bench {
                pair,
                timeout,
                json,
            } => {
                let cfg = load_config()?;
                run_bench(&pair, &cfg.compare_options(), timeout, json).await
            }
            CliCommand::Checksum { path } => run_checksum(&path).await,
            CliCommand::Strategies => run_strategies(),
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man(),
        }
    }
}

/// Exit status for an argument error: help and version requests succeed, and
/// anything else is a failure so it never reads as a verdict.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_FAILED,
    }
}

fn load_config() -> Result<config::FilesageConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
