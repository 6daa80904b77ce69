//! Private key file resolution and loading

use std::path::{Path, PathBuf};

use russh::keys::load_secret_key;
use russh::keys::ssh_key::PrivateKey;
use tracing::{debug, warn};

/// Private key used for public key authentication
#[derive(Debug, Clone)]
pub struct PrivateKeyFile {
    path: PathBuf,
}

impl PrivateKeyFile {
    /// Resolve a key file path
    ///
    /// Loose permissions are reported but accepted, as OpenSSH clients
    /// differ on whether to refuse them.
    ///
    /// # Errors
    /// Returns `KeyError::NotFound` if the path is not a file
    pub fn resolve(path: impl Into<PathBuf>) -> Result<Self, KeyError> {
        let path = path.into();

        if !path.is_file() {
            return Err(KeyError::NotFound(path.display().to_string()));
        }

        if has_open_permissions(&path)? {
            warn!(
                path = %path.display(),
                "private key is accessible by group or others (should be 600)"
            );
        }

        debug!(path = %path.display(), "resolved private key");
        Ok(Self { path })
    }

    /// Path to the key file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the key
    ///
    /// # Errors
    /// Returns `KeyError::Invalid` if the file is not a supported
    /// unencrypted private key
    pub fn load(&self) -> Result<PrivateKey, KeyError> {
        load_secret_key(&self.path, None).map_err(|e| KeyError::Invalid {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Key resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("invalid private key {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(unix)]
fn has_open_permissions(path: &Path) -> Result<bool, KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group and other bits
    Ok(mode & 0o77 != 0)
}

#[cfg(not(unix))]
fn has_open_permissions(_path: &Path) -> Result<bool, KeyError> {
    Ok(false)
}
