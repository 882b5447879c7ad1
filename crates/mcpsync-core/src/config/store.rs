//! Settings store for loading and saving settings.toml.

use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::fs::{atomic_write, read_optional};

use super::Settings;
use super::paths::SETTINGS_FILE;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store rooted in a state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self::from_path(state_dir.join(SETTINGS_FILE))
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings. A missing file yields defaults; missing fields take
    /// their defaults; out-of-range values are clamped.
    pub fn load(&self) -> SyncResult<Settings> {
        let Some(bytes) = read_optional(&self.path)? else {
            return Ok(Settings::default());
        };
        let content = String::from_utf8(bytes).map_err(|e| {
            SyncError::Settings(format!("{} is not valid UTF-8: {e}", self.path.display()))
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|e| {
            SyncError::Settings(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(settings.normalized())
    }

    /// Persist the full document.
    pub fn save(&self, settings: &Settings) -> SyncResult<()> {
        let settings = settings.clone().normalized();
        let content = toml::to_string_pretty(&settings)
            .map_err(|e| SyncError::Settings(format!("failed to serialize settings: {e}")))?;
        atomic_write(&self.path, content.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path());
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn partial_document_merges_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path());
        std::fs::write(store.path(), "refresh_interval_secs = 2\nauto_sync = false\n").unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.refresh_interval_secs, 5);
        assert!(!settings.auto_sync);
        assert_eq!(settings.backup_retention, 10);
        assert_eq!(settings.enabled_apps.len(), 7);
    }

    #[test]
    fn save_then_load_keeps_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path());
        std::fs::write(store.path(), "theme = \"dark\"\nbackup_retention = 3\n").unwrap();

        let mut settings = store.load().unwrap();
        settings.auto_sync = false;
        store.save(&settings).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("theme = \"dark\""));
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.backup_retention, 3);
        assert!(!reloaded.auto_sync);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path());
        std::fs::write(store.path(), "auto_sync = [").unwrap();

        assert!(matches!(store.load(), Err(SyncError::Settings(_))));
    }

    #[test]
    fn path_overrides_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::new(tmp.path());
        let mut settings = Settings::default();
        settings
            .path_overrides
            .insert("cursor".to_string(), tmp.path().join("cursor.json"));
        store.save(&settings).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(
            reloaded.path_overrides.get("cursor"),
            Some(&tmp.path().join("cursor.json"))
        );
    }
}
