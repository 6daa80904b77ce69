//! SSH command execution using russh crate

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::PrivateKeyWithHashAlg;
use russh::keys::ssh_key;
use russh::{Channel, ChannelMsg, Disconnect, client};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::drain::{EventSource, StreamEvent, drain_until_deadline};
use crate::error::ExecError;
use crate::keys::PrivateKeyFile;
use crate::result::{CommandResult, ConnectionInfo};
use crate::traits::RemoteExecutor;

/// SSH extended data type code for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Unknown hosts are accepted (StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// Output events of one exec request on a session channel
struct ChannelEvents {
    channel: Channel<client::Msg>,
}

#[async_trait]
impl EventSource for ChannelEvents {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.channel.wait().await? {
                ChannelMsg::Data { data } => return Some(StreamEvent::Stdout(data.to_vec())),
                ChannelMsg::ExtendedData { data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    return Some(StreamEvent::Stderr(data.to_vec()));
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    return Some(StreamEvent::Exit(exit_status.cast_signed()));
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    debug!(signal = ?signal_name, "remote process killed by signal");
                }
                // exit status may still follow eof, so keep reading until close
                ChannelMsg::Eof => debug!("remote output closed"),
                ChannelMsg::Close => return None,
                _ => {}
            }
        }
    }
}

/// SSH command executor
///
/// Holds one SSH session for the lifetime of a batch. The session has to be
/// opened with [`SshExecutor::connect`] before commands can run.
pub struct SshExecutor {
    /// Connection configuration
    conn_info: ConnectionInfo,
    /// Private key used to authenticate
    key: PrivateKeyFile,
    /// SSH session (set by `connect`, cleared by `disconnect`)
    session: Mutex<Option<client::Handle<SshClientHandler>>>,
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor")
            .field("conn_info", &self.conn_info)
            .field("key", &self.key)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl SshExecutor {
    /// Create a new SSH executor
    ///
    /// # Arguments
    /// * `conn_info` - Connection details (host, user, port)
    /// * `key_path` - Private key file used for authentication
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if the key file cannot be resolved
    pub fn new(conn_info: ConnectionInfo, key_path: impl Into<PathBuf>) -> Result<Self, ExecError> {
        let key = PrivateKeyFile::resolve(key_path)
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

        Ok(Self {
            conn_info,
            key,
            session: Mutex::new(None),
        })
    }

    /// Get connection info
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.conn_info
    }

    /// Connect and authenticate to the remote host
    ///
    /// Calling this on a connected executor is a no-op.
    ///
    /// # Errors
    /// Returns `ExecError::ConnectionFailed` if the host is unreachable,
    /// `ExecError::SshKeyError` if the key cannot be parsed, and
    /// `ExecError::AuthenticationFailed` if the server rejects the key
    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    pub async fn connect(&self) -> Result<(), ExecError> {
        let mut session_lock = self.session.lock().await;

        if session_lock.is_some() {
            return Ok(());
        }

        info!(
            host = %self.conn_info.host,
            port = self.conn_info.port,
            user = %self.conn_info.user,
            "connecting to SSH"
        );

        let key_pair = self
            .key
            .load()
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

        let config = Arc::new(client::Config::default());

        let mut session = client::connect(
            config,
            (&self.conn_info.host[..], self.conn_info.port),
            SshClientHandler,
        )
        .await
        .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        let auth_res = session
            .authenticate_publickey(
                &self.conn_info.user,
                PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
            )
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(
                "Public key authentication failed".to_string(),
            ));
        }

        info!(host = %self.conn_info.host, "SSH connected and authenticated");

        *session_lock = Some(session);
        Ok(())
    }

    /// Execute command on remote host
    #[instrument(skip(self, cmd), fields(host = %self.conn_info.host))]
    async fn execute_remote(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        let session_lock = self.session.lock().await;

        let session = session_lock.as_ref().ok_or(ExecError::NotConnected)?;

        debug!(command = %cmd, "executing remote command");

        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut events = ChannelEvents { channel };
        let result = drain_until_deadline(&mut events, timeout).await;

        match &result {
            Ok(cmd_result) => {
                debug!(
                    command = %cmd,
                    exit_code = cmd_result.exit_code,
                    duration = ?cmd_result.duration,
                    "remote command completed"
                );
            }
            Err(ExecError::Timeout { .. }) => {
                // The remote process is not signalled and may keep running;
                // closing only stops this side from waiting on it.
                warn!(command = %cmd, timeout = ?timeout, "command timed out, closing channel");
                if let Err(e) = events.channel.close().await {
                    debug!(error = %e, "failed to close timed out channel");
                }
            }
            Err(_) => {}
        }

        result
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        self.execute_remote(cmd, timeout).await
    }

    /// Disconnect from remote host
    async fn disconnect(&self) -> Result<(), ExecError> {
        let mut session_lock = self.session.lock().await;

        if let Some(session) = session_lock.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
            info!(host = %self.conn_info.host, "SSH disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        // Only a cheap check; a dead transport is noticed on next use
        let session_opt = self.session.try_lock();
        session_opt.map(|s| s.is_some()).unwrap_or(false)
    }

    fn executor_type(&self) -> &'static str {
        "ssh"
    }
}

/// Builder for `SshExecutor`
pub struct SshExecutorBuilder {
    conn_info: ConnectionInfo,
    key_path: Option<PathBuf>,
}

impl SshExecutorBuilder {
    /// Create builder with required fields
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conn_info: ConnectionInfo::new(host, user),
            key_path: None,
        }
    }

    /// Set SSH key path
    #[must_use]
    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.conn_info.port = port;
        self
    }

    /// Build the executor
    ///
    /// # Errors
    /// Returns `ExecError::ConfigError` if no key path was set and
    /// `ExecError::SshKeyError` if the key cannot be resolved
    pub fn build(self) -> Result<SshExecutor, ExecError> {
        let key_path = self
            .key_path
            .ok_or_else(|| ExecError::ConfigError("private key path is required".to_string()))?;
        SshExecutor::new(self.conn_info, key_path)
    }
}
