//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use crate::adapter::{AdapterContext, AdapterRegistry};
use crate::backup::BackupManager;
use crate::config::paths::{self, BACKUP_DIR};
use crate::config::{Settings, SettingsStore};
use crate::error::SyncResult;
use crate::sync::SyncEngine;

/// Unified application context for dependency injection.
///
/// Holds the directories everything else resolves against. Frontends build
/// it once at startup and hand out the stores and the engine from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    config_dir: PathBuf,
    app_support_dir: PathBuf,
    state_dir: PathBuf,
}

impl AppContext {
    /// Create a new context with explicit paths.
    pub fn new(
        home_dir: PathBuf,
        config_dir: PathBuf,
        app_support_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            home_dir,
            config_dir,
            app_support_dir,
            state_dir,
        }
    }

    /// Context for the current user. `state_dir` defaults to
    /// `<config dir>/mcpsync`.
    pub fn from_system(state_dir: Option<PathBuf>) -> SyncResult<Self> {
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => paths::default_state_dir()?,
        };
        Ok(Self::new(
            paths::home_dir()?,
            paths::config_dir()?,
            paths::app_support_dir()?,
            state_dir,
        ))
    }

    /// Every directory below one root (for tests and sandboxes).
    pub fn rooted_at(root: &Path) -> Self {
        Self::new(
            root.join("home"),
            root.join("config"),
            root.join("app-support"),
            root.join("state"),
        )
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn app_support_dir(&self) -> &Path {
        &self.app_support_dir
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir.join(BACKUP_DIR)
    }

    /// Adapter paths with the settings' overrides applied.
    pub fn adapter_context(&self, settings: &Settings) -> AdapterContext {
        AdapterContext::new(
            self.home_dir.clone(),
            self.config_dir.clone(),
            self.app_support_dir.clone(),
        )
        .with_overrides(settings.path_overrides.clone())
    }

    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(&self.state_dir)
    }

    pub fn backup_manager(&self, settings: &Settings) -> BackupManager {
        BackupManager::new(self.backup_dir(), settings.backup_retention)
    }

    pub fn adapter_registry(&self) -> AdapterRegistry {
        AdapterRegistry::with_default_adapters()
    }

    /// A fresh engine configured from `settings`. Nothing is read yet.
    pub fn sync_engine(&self, settings: &Settings) -> SyncEngine {
        SyncEngine::new(
            self.adapter_registry(),
            self.adapter_context(settings),
            self.backup_manager(settings),
            settings.enabled_apps.clone(),
        )
    }
}
