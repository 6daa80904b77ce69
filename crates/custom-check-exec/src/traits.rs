//! Remote executor trait

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Executes shell commands against one target
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command, failing with `ExecError::Timeout` if its output is
    /// still open after `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Run a command and fold any execution error into a failing result
    ///
    /// A timeout becomes the timeout sentinel; any other error becomes
    /// exit code 1 with the error text on stderr.
    async fn execute(&self, cmd: &str, timeout: Duration) -> CommandResult {
        match self.run_with_timeout(cmd, timeout).await {
            Ok(result) => result,
            Err(e) => {
                if !e.is_timeout() {
                    warn!(error = %e, "command execution failed");
                }
                CommandResult::from(e)
            }
        }
    }

    /// Close the underlying session, if any
    async fn disconnect(&self) -> Result<(), ExecError> {
        Ok(())
    }

    /// Whether the executor currently holds a live session
    fn is_connected(&self) -> bool {
        true
    }

    /// Short name for logs
    fn executor_type(&self) -> &'static str;
}

#[async_trait]
impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        (**self).run_with_timeout(cmd, timeout).await
    }

    async fn execute(&self, cmd: &str, timeout: Duration) -> CommandResult {
        (**self).execute(cmd, timeout).await
    }

    async fn disconnect(&self) -> Result<(), ExecError> {
        (**self).disconnect().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn executor_type(&self) -> &'static str {
        (**self).executor_type()
    }
}
