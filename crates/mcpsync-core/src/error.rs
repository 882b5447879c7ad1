//! Error taxonomy for the synchronization engine.

use std::io;
use std::path::{Path, PathBuf};

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by adapters, the registry, the coordinator and the stores.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The application's config file does not exist. Callers treat this as
    /// "not detected" rather than as a failure.
    #[error("config file for '{app}' not found: {}", path.display())]
    ConfigNotFound { app: String, path: PathBuf },

    #[error("malformed config for '{app}' ({}): {message}", path.display())]
    ConfigParse {
        app: String,
        path: PathBuf,
        message: String,
    },

    #[error("config for '{app}' changed on disk since it was last read: {}", path.display())]
    WriteConflict { app: String, path: PathBuf },

    #[error("permission denied: {}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("backup of '{app}' failed, write aborted: {message}")]
    BackupFailed { app: String, message: String },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup #{seq} of '{app}' not found")]
    UnknownBackup { app: String, seq: u64 },

    #[error("unknown application '{0}'")]
    UnknownApp(String),

    #[error("server '{server}' not found in '{app}'")]
    UnknownServer { server: String, app: String },

    #[error("settings error: {0}")]
    Settings(String),
}

impl SyncError {
    /// Classify a read-side I/O failure.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            SyncError::Permission {
                path: path.to_path_buf(),
                source,
            }
        } else {
            SyncError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Classify a write-side I/O failure.
    pub fn write(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            SyncError::Permission {
                path: path.to_path_buf(),
                source,
            }
        } else {
            SyncError::Write {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn parse(app: &str, path: &Path, message: impl Into<String>) -> Self {
        SyncError::ConfigParse {
            app: app.to_string(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Reasons a server definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server name must not be empty")]
    EmptyName,

    #[error("server '{server}' has no launch command")]
    MissingCommand { server: String },

    #[error("server '{server}' already exists in '{app}'")]
    DuplicateName { server: String, app: String },
}
