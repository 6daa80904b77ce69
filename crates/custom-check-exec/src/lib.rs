//! custom-check-exec: Remote command execution with bounded output draining
//!
//! Provides the executor trait, an SSH implementation over a single persistent
//! session, and a local implementation that shares the same drain loop.

pub mod drain;
pub mod error;
pub mod keys;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use drain::{EventSource, StreamEvent, drain_until_deadline};
pub use error::ExecError;
pub use keys::{KeyError, PrivateKeyFile};
pub use local::LocalExecutor;
pub use result::{CommandResult, ConnectionInfo, TIMEOUT_MESSAGE};
pub use ssh::{SshExecutor, SshExecutorBuilder};
pub use traits::RemoteExecutor;
