//! custom-check
//!
//! Executes the commands of a CSV file on a remote host over SSH and writes
//! the failing ones to an output CSV

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;

use custom_check::cli::Cli;
use custom_check::{RunConfig, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = RunConfig::from(Cli::parse());
    let log_guard = logging::init(&config.log_file)?;

    let summary = custom_check::run(&config)
        .await
        .wrap_err_with(|| format!("custom checks against {} aborted", config.server_ip))?;

    println!(
        "{} checks run: {} passed, {} with warnings, {} failed",
        summary.total, summary.succeeded, summary.warnings, summary.failed
    );

    // flush the log before a strict exit skips destructors
    drop(log_guard);
    if config.strict && summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
