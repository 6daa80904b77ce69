//! Result types for command execution

use std::time::Duration;

use crate::error::ExecError;

/// stderr text reported when a command's output does not close in time
pub const TIMEOUT_MESSAGE: &str =
    "Command timed out, make sure no interactive commands like \"more\", \"less\" etc";

/// Exit code reported when the remote side closed without an exit status
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Result of a command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub exit_code: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Build a result from raw stream buffers
    ///
    /// Buffers are decoded only once complete so multi-byte sequences split
    /// across reads survive; invalid sequences become U+FFFD.
    #[must_use]
    pub fn from_bytes(exit_code: i32, stdout: &[u8], stderr: &[u8], duration: Duration) -> Self {
        Self {
            exit_code,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            duration,
        }
    }

    /// Synthetic failure for a command that outlived its deadline
    #[must_use]
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            exit_code: 1,
            stdout: String::new(),
            stderr: TIMEOUT_MESSAGE.to_string(),
            duration: timeout,
        }
    }

    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether the command wrote anything to stderr
    #[must_use]
    pub fn has_stderr(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// Whether the command wrote anything to stdout
    #[must_use]
    pub fn has_stdout(&self) -> bool {
        !self.stdout.is_empty()
    }
}

impl From<ExecError> for CommandResult {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Timeout { timeout } => Self::timed_out(timeout),
            other => Self {
                exit_code: 1,
                stdout: String::new(),
                stderr: other.to_string(),
                duration: Duration::ZERO,
            },
        }
    }
}

/// Connection information for SSH
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    pub port: u16,
    /// Username
    pub user: String,
}

fn default_port() -> u16 {
    22
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}
