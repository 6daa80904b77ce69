//! Classification of results, per-command log entries and the failures file

use std::io::Write;
use std::path::Path;

use custom_check_exec::CommandResult;
use serde::Serialize;
use tracing::{error, info};

use crate::error::CheckError;
use crate::records::CommandRecord;

const FAILURE_HEADER: [&str; 3] = ["script", "exit_code", "output"];

/// How a command's result is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing on stderr
    Success,
    /// stderr alongside stdout; logged but not a failure
    Warning,
    /// stderr with no stdout
    Failure,
}

/// Classify a result by what it wrote to stderr
///
/// The exit code is deliberately ignored: a command that exits non-zero
/// without writing to stderr counts as a success, and one that exits zero
/// with only stderr output counts as a failure.
#[must_use]
pub fn classify(result: &CommandResult) -> Outcome {
    match (result.has_stderr(), result.has_stdout()) {
        (false, _) => Outcome::Success,
        (true, true) => Outcome::Warning,
        (true, false) => Outcome::Failure,
    }
}

/// A failed command as written to the failures file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub script: String,
    pub exit_code: i32,
    /// Captured stderr
    pub output: String,
}

/// Logs each result and keeps the failures in processing order
#[derive(Debug, Default)]
pub struct Reporter {
    failures: Vec<FailureRecord>,
}

impl Reporter {
    /// Create an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log one command's result and remember it if it failed
    pub fn record(&mut self, record: &CommandRecord, result: &CommandResult) -> Outcome {
        let outcome = classify(result);

        match outcome {
            Outcome::Success => info!(
                id = %record.id,
                script = %record.script,
                exit_code = result.exit_code,
                stdout = ?result.stdout,
                "custom check passed"
            ),
            Outcome::Warning => info!(
                id = %record.id,
                script = %record.script,
                exit_code = result.exit_code,
                stdout = ?result.stdout,
                stderr = ?result.stderr,
                "custom check passed with stderr output"
            ),
            Outcome::Failure => {
                error!(
                    id = %record.id,
                    script = %record.script,
                    exit_code = result.exit_code,
                    stderr = ?result.stderr,
                    "custom check failed"
                );
                self.failures.push(FailureRecord {
                    script: record.script.clone(),
                    exit_code: result.exit_code,
                    output: result.stderr.clone(),
                });
            }
        }

        outcome
    }

    /// Failures seen so far, oldest first
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Write the failures as CSV, header first
    ///
    /// # Errors
    /// Returns the underlying CSV error if writing fails
    pub fn write_failures<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        // header written by hand so an empty run still gets one
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        writer.write_record(FAILURE_HEADER)?;
        for failure in &self.failures {
            writer.serialize(failure)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the failures file, replacing any existing one
    ///
    /// # Errors
    /// Returns `CheckError::Output` if the file cannot be created or written
    pub fn write_failures_file(&self, path: &Path) -> Result<(), CheckError> {
        let to_error = |source| CheckError::Output {
            path: path.to_path_buf(),
            source,
        };

        let file = std::fs::File::create(path).map_err(|e| to_error(csv::Error::from(e)))?;
        self.write_failures(file).map_err(to_error)?;

        info!(path = %path.display(), failures = self.failures.len(), "wrote failures file");
        Ok(())
    }
}
