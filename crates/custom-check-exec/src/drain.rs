//! Bounded draining of a running command's output streams
//!
//! Remote channels do not always close promptly: a command waiting on a
//! terminal (`less`, `more`, a password prompt) keeps them open forever. The
//! drain loop waits for the next piece of output only until a fixed deadline
//! and then gives up with [`ExecError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use crate::error::ExecError;
use crate::result::{CommandResult, UNKNOWN_EXIT_CODE};

/// One piece of progress reported by a running command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Bytes written to stdout
    Stdout(Vec<u8>),
    /// Bytes written to stderr
    Stderr(Vec<u8>),
    /// Exit status of the process
    Exit(i32),
}

/// Source of output events for one command invocation
///
/// `next_event` returns `None` once both output streams are closed and no
/// further events will arrive.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next event
    async fn next_event(&mut self) -> Option<StreamEvent>;
}

/// Collect output from `source` until it closes or `timeout` elapses
///
/// Each wait is capped at the time left before the deadline, so the loop never
/// overshoots the deadline by more than one wakeup.
///
/// # Errors
/// Returns `ExecError::Timeout` if the source is still open at the deadline
pub async fn drain_until_deadline<S>(
    source: &mut S,
    timeout: Duration,
) -> Result<CommandResult, ExecError>
where
    S: EventSource + ?Sized,
{
    let start = Instant::now();
    let deadline = start + timeout;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;

    loop {
        // timeout_at polls the source before the timer, so a source that is
        // already closed wins over an expired deadline
        let event = match timeout_at(deadline, source.next_event()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                debug!(timeout = ?timeout, "output still open at deadline");
                return Err(ExecError::Timeout { timeout });
            }
        };

        match event {
            StreamEvent::Stdout(data) => {
                trace!(len = data.len(), "stdout chunk");
                stdout.extend_from_slice(&data);
            }
            StreamEvent::Stderr(data) => {
                trace!(len = data.len(), "stderr chunk");
                stderr.extend_from_slice(&data);
            }
            StreamEvent::Exit(code) => exit_code = Some(code),
        }

        // output that never stops must not keep the command alive
        if Instant::now() > deadline {
            debug!(timeout = ?timeout, "output still flowing at deadline");
            return Err(ExecError::Timeout { timeout });
        }
    }

    let exit_code = exit_code.unwrap_or(UNKNOWN_EXIT_CODE);

    Ok(CommandResult::from_bytes(
        exit_code,
        &stdout,
        &stderr,
        start.elapsed(),
    ))
}
