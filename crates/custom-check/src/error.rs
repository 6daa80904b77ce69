//! Error types for the batch run

use std::path::PathBuf;

use custom_check_exec::ExecError;
use thiserror::Error;

/// Errors that abort a batch run
///
/// Per-command problems never show up here: they are folded into the
/// command's result and reported through the log and the failures file.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Session could not be established
    #[error("could not connect to remote host: {0}")]
    Connection(#[source] ExecError),

    /// Input commands file could not be read or parsed
    #[error("failed to read commands from {path}: {source}")]
    Input {
        /// Input file path
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// Input commands file lacks a required column
    #[error("commands file {path} has no `{column}` column")]
    MissingColumn {
        /// Input file path
        path: PathBuf,
        /// Name of the missing column
        column: &'static str,
    },

    /// Failures file could not be written
    #[error("failed to write failures to {path}: {source}")]
    Output {
        /// Output file path
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// Log file could not be set up
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
