//! custom-check: run a CSV list of shell commands on one host over SSH
//!
//! Each command is executed with a bounded wait on its output, classified by
//! what it wrote to stderr, logged, and, if it failed, written to a failures
//! CSV.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod records;
pub mod report;
pub mod runner;

use custom_check_exec::{RemoteExecutor, SshExecutor};
use tracing::info;

pub use config::RunConfig;
pub use error::CheckError;
pub use records::CommandRecord;
pub use report::{FailureRecord, Outcome, Reporter, classify};
pub use runner::{BatchRunner, BatchSummary};

/// Load the commands, connect, run them all and write the failures file
///
/// Input problems are detected before connecting. A connection failure aborts
/// the run without writing the failures file.
///
/// # Errors
/// Returns `CheckError` if the input cannot be read, the session cannot be
/// established or the failures file cannot be written
pub async fn run(config: &RunConfig) -> Result<BatchSummary, CheckError> {
    let records = records::load(&config.custom_commands)?;

    let executor = SshExecutor::new(config.connection_info(), &config.private_key_path)
        .map_err(CheckError::Connection)?;
    executor.connect().await.map_err(CheckError::Connection)?;

    execute_and_report(executor, &records, config).await
}

/// Run `records` on an already connected executor and write the failures file
///
/// # Errors
/// Returns `CheckError::Output` if the failures file cannot be written
pub async fn execute_and_report<E: RemoteExecutor>(
    executor: E,
    records: &[CommandRecord],
    config: &RunConfig,
) -> Result<BatchSummary, CheckError> {
    let mut reporter = Reporter::new();

    let summary = BatchRunner::new(executor)
        .with_timeout(config.command_timeout)
        .run(records, &mut reporter)
        .await;

    reporter.write_failures_file(&config.output)?;

    info!(
        failed = summary.failed,
        output = %config.output.display(),
        "run complete"
    );

    Ok(summary)
}
