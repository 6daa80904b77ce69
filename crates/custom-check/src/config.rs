//! Run configuration

use std::path::PathBuf;
use std::time::Duration;

use custom_check_exec::ConnectionInfo;

/// Wall-clock limit for a single command's output to close
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Result log location, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "logs/custom_check_result.log";

/// Everything a batch run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Remote host address
    pub server_ip: String,
    /// SSH port
    pub port: u16,
    /// Login user
    pub username: String,
    /// Private key used to authenticate
    pub private_key_path: PathBuf,
    /// Input CSV with `id` and `result` columns
    pub custom_commands: PathBuf,
    /// Output CSV for failed commands
    pub output: PathBuf,
    /// Append-only result log
    pub log_file: PathBuf,
    /// Per-command timeout
    pub command_timeout: Duration,
    /// Whether recorded failures make the process exit non-zero
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            server_ip: String::new(),
            port: 22,
            username: String::new(),
            private_key_path: PathBuf::new(),
            custom_commands: PathBuf::new(),
            output: PathBuf::new(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            strict: false,
        }
    }
}

impl RunConfig {
    /// SSH connection details
    #[must_use]
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(&self.server_ip, &self.username).with_port(self.port)
    }
}
