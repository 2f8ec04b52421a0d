//! CLI command handlers, one per file.

mod bench;
mod checksum;
mod compare;
mod completions;
mod strategies;

pub use bench::run_bench;
pub use checksum::run_checksum;
pub use compare::{run_compare, EXIT_FAILED};
pub use completions::{run_completions, run_man};
pub use strategies::run_strategies;
