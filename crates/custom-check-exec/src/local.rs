//! Local command execution using `tokio::process`

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::drain::{EventSource, StreamEvent, drain_until_deadline};
use crate::error::ExecError;
use crate::result::{CommandResult, UNKNOWN_EXIT_CODE};
use crate::traits::RemoteExecutor;

const READ_CHUNK: usize = 4096;

/// Local command executor
///
/// Executes commands on the local machine through `sh -c`, draining output
/// with the same deadline loop as the SSH executor. A child that outlives its
/// deadline is killed.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipes of a spawned child, read until both hit EOF
struct ChildEvents {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    exited: bool,
}

enum Pipe {
    Stdout,
    Stderr,
}

async fn read_open<R: AsyncRead + Unpin>(
    pipe: Option<&mut R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match pipe {
        Some(pipe) => pipe.read(buf).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl EventSource for ChildEvents {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        let mut out_buf = [0u8; READ_CHUNK];
        let mut err_buf = [0u8; READ_CHUNK];

        loop {
            if self.stdout.is_none() && self.stderr.is_none() {
                if self.exited {
                    return None;
                }
                self.exited = true;
                let code = match self.child.wait().await {
                    Ok(status) => status.code().unwrap_or(UNKNOWN_EXIT_CODE),
                    Err(e) => {
                        warn!(error = %e, "failed to wait for child");
                        UNKNOWN_EXIT_CODE
                    }
                };
                return Some(StreamEvent::Exit(code));
            }

            let (pipe, read) = tokio::select! {
                read = read_open(self.stdout.as_mut(), &mut out_buf) => (Pipe::Stdout, read),
                read = read_open(self.stderr.as_mut(), &mut err_buf) => (Pipe::Stderr, read),
            };

            match (pipe, read) {
                (Pipe::Stdout, Ok(n)) if n > 0 => {
                    return Some(StreamEvent::Stdout(out_buf[..n].to_vec()));
                }
                (Pipe::Stderr, Ok(n)) if n > 0 => {
                    return Some(StreamEvent::Stderr(err_buf[..n].to_vec()));
                }
                (Pipe::Stdout, read) => {
                    if let Err(e) = read {
                        debug!(error = %e, "stdout read failed");
                    }
                    self.stdout = None;
                }
                (Pipe::Stderr, read) => {
                    if let Err(e) = read {
                        debug!(error = %e, "stderr read failed");
                    }
                    self.stderr = None;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        debug!(command = %cmd, timeout = ?timeout, "executing local command");

        // Use shell to support pipes, redirections, etc.
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let mut events = ChildEvents {
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
            exited: false,
        };

        let result = drain_until_deadline(&mut events, timeout).await;

        if let Ok(cmd_result) = &result {
            debug!(
                command = %cmd,
                exit_code = cmd_result.exit_code,
                duration = ?cmd_result.duration,
                "command completed"
            );
        }

        result
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}
