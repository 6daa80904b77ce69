//! Sequential execution of command records over one session

use std::time::Duration;

use custom_check_exec::{CommandResult, RemoteExecutor};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_COMMAND_TIMEOUT;
use crate::records::CommandRecord;
use crate::report::{Outcome, Reporter};

/// Counts of a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn add(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Warning => self.warnings += 1,
            Outcome::Failure => self.failed += 1,
        }
    }
}

/// One-line console summary of a result, streams Debug-escaped
fn result_line(result: &CommandResult) -> String {
    format!(
        "exit_code: {}, stdout: {:?}, stderr: {:?}",
        result.exit_code, result.stdout, result.stderr
    )
}

/// Runs records one at a time on an executor it owns
///
/// `run` consumes the runner and disconnects the executor when the last
/// record is done, so a session is closed exactly once.
pub struct BatchRunner<E> {
    executor: E,
    timeout: Duration,
    progress: bool,
}

impl<E: RemoteExecutor> BatchRunner<E> {
    /// Create a runner with the default per-command timeout
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            progress: true,
        }
    }

    /// Set per-command timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Print each record and its result to stdout
    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Execute every record in order, then disconnect
    ///
    /// Per-command errors and timeouts are recorded as results; nothing here
    /// interrupts the batch.
    ///
    /// Not wrapped in a span: per-command log lines must read
    /// `time LEVEL message` with nothing in between.
    pub async fn run(self, records: &[CommandRecord], reporter: &mut Reporter) -> BatchSummary {
        debug!(
            executor = self.executor.executor_type(),
            count = records.len(),
            "starting custom checks"
        );
        let mut summary = BatchSummary::default();

        for record in records {
            if self.progress {
                println!("checking: {} script: {}", record.id, record.script);
            }
            debug!(id = %record.id, "running custom check");

            let result = self.executor.execute(&record.command(), self.timeout).await;
            if self.progress {
                println!("{}", result_line(&result));
            }
            summary.add(reporter.record(record, &result));
        }

        if let Err(e) = self.executor.disconnect().await {
            warn!(error = %e, "failed to disconnect cleanly");
        }

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            warnings = summary.warnings,
            failed = summary.failed,
            "custom checks finished"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use custom_check_exec::ExecError;

    use crate::logging::capture::CapturedLog;

    use super::*;

    /// Returns a canned result per command and records what it was asked
    #[derive(Default)]
    struct EchoExecutor {
        seen: Mutex<Vec<(String, Duration)>>,
    }

    #[async_trait]
    impl RemoteExecutor for EchoExecutor {
        async fn run_with_timeout(
            &self,
            cmd: &str,
            timeout: Duration,
        ) -> Result<CommandResult, ExecError> {
            self.seen.lock().unwrap().push((cmd.to_string(), timeout));
            if cmd == "hang" {
                return Err(ExecError::Timeout { timeout });
            }
            Ok(CommandResult {
                exit_code: 0,
                stdout: format!("{cmd}\n"),
                stderr: String::new(),
                duration: Duration::ZERO,
            })
        }

        fn executor_type(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_commands_unescaped_and_timeout_applied() {
        let executor = EchoExecutor::default();
        let records = vec![
            CommandRecord::new("1", "cd /tmp\\npwd"),
            CommandRecord::new("2", "hang"),
        ];
        let mut reporter = Reporter::new();

        let runner = BatchRunner::new(&executor)
            .with_timeout(Duration::from_secs(3))
            .with_progress(false);
        let summary = runner.run(&records, &mut reporter).await;

        assert_eq!(
            *executor.seen.lock().unwrap(),
            vec![
                ("cd /tmp\npwd".to_string(), Duration::from_secs(3)),
                ("hang".to_string(), Duration::from_secs(3)),
            ]
        );
        assert_eq!(
            summary,
            BatchSummary {
                total: 2,
                succeeded: 1,
                warnings: 0,
                failed: 1,
            }
        );
        assert_eq!(reporter.failures()[0].script, "hang");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = EchoExecutor::default();
        let mut reporter = Reporter::new();

        let summary = BatchRunner::new(&executor)
            .with_progress(false)
            .run(&[], &mut reporter)
            .await;

        assert_eq!(summary, BatchSummary::default());
        assert!(reporter.failures().is_empty());
    }

    #[tokio::test]
    async fn test_log_lines_have_no_span_prefix() {
        let log = CapturedLog::default();
        let _default = tracing::subscriber::set_default(log.subscriber());

        let executor = EchoExecutor::default();
        let records = vec![
            CommandRecord::new("1", "echo hello"),
            CommandRecord::new("2", "hang"),
        ];
        let mut reporter = Reporter::new();
        BatchRunner::new(&executor)
            .with_progress(false)
            .run(&records, &mut reporter)
            .await;

        let output = log.contents();
        let checks: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("custom check passed") || line.contains("custom check failed"))
            .collect();
        assert_eq!(checks.len(), 2, "{output}");

        for line in checks {
            // timestamp, level, then the message itself
            let rest = line.split_once(" INFO ").or_else(|| line.split_once(" ERROR "));
            let (_, message) = rest.unwrap_or_else(|| panic!("no level in {line}"));
            assert!(message.starts_with("custom check"), "span prefix in {line}");
        }
    }

    #[test]
    fn test_result_line() {
        let result = CommandResult {
            exit_code: 2,
            stdout: "partial\n".to_string(),
            stderr: "warn\n".to_string(),
            duration: Duration::ZERO,
        };

        assert_eq!(
            result_line(&result),
            r#"exit_code: 2, stdout: "partial\n", stderr: "warn\n""#
        );
    }
}
