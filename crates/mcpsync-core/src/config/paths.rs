//! Platform directory resolution.

use std::path::PathBuf;

use crate::error::{SyncError, SyncResult};

/// Name of the settings document inside the state directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Name of the backup root inside the state directory.
pub const BACKUP_DIR: &str = "backups";

/// Default state directory: `<config dir>/mcpsync`.
pub fn default_state_dir() -> SyncResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("mcpsync"))
        .ok_or_else(|| SyncError::Settings("could not determine config directory".to_string()))
}

pub fn home_dir() -> SyncResult<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| SyncError::Settings("could not determine home directory".to_string()))
}

/// Per-user application configuration directory (`~/.config` on Linux,
/// `%APPDATA%` on Windows, `~/Library/Application Support` on macOS).
pub fn config_dir() -> SyncResult<PathBuf> {
    match dirs::config_dir() {
        Some(dir) => Ok(dir),
        None => Ok(home_dir()?.join(".config")),
    }
}

/// Where desktop applications keep their support files. Same root as
/// [`config_dir`] on every platform the desktop apps ship on.
pub fn app_support_dir() -> SyncResult<PathBuf> {
    config_dir()
}
