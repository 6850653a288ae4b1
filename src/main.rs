//! triad - Planner, Worker and Verifier agents over an in-process message bus.

use clap::Parser;
use std::process::ExitCode;

use triad::cli::Commands;
use triad::logging;

#[tokio::main]
async fn main() -> ExitCode {
    // Keep the guard alive so buffered file logs are flushed on exit.
    let _guard = match logging::init() {
        Ok((guard, _log_dir)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = Commands::parse();

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
