use filesage_core::logging;

mod cli;

use crate::cli::{CliCommand, EXIT_FAILED};

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("filesage error: {:#}", err);
            std::process::exit(EXIT_FAILED);
        }
    }
}
