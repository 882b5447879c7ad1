//! Engine settings document.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterRegistry;

pub const SETTINGS_VERSION: u32 = 1;
pub const DEFAULT_REFRESH_SECS: u64 = 10;
pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 300;
pub const DEFAULT_BACKUP_RETENTION: usize = 10;

/// User-tunable engine settings, stored as `settings.toml`.
///
/// Every field has a default so partial documents load cleanly. Keys this
/// version does not know are kept in `extra` and written back on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Applications the engine manages, by id.
    #[serde(default = "default_enabled_apps")]
    pub enabled_apps: Vec<String>,

    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,

    /// Backups kept per application.
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    /// Persist mutations immediately instead of leaving them pending.
    #[serde(default = "default_true")]
    pub auto_sync: bool,

    /// Config file location overrides, by application id.
    #[serde(default)]
    pub path_overrides: BTreeMap<String, PathBuf>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_enabled_apps() -> Vec<String> {
    AdapterRegistry::with_default_adapters()
        .ids()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

fn default_backup_retention() -> usize {
    DEFAULT_BACKUP_RETENTION
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            enabled_apps: default_enabled_apps(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            auto_sync: true,
            path_overrides: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Clamp values into their valid ranges and drop duplicate app ids.
    pub fn normalized(mut self) -> Self {
        if self.version < SETTINGS_VERSION {
            self.version = SETTINGS_VERSION;
        }
        self.refresh_interval_secs = self
            .refresh_interval_secs
            .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS);
        self.backup_retention = self.backup_retention.max(1);

        let mut seen = std::collections::HashSet::new();
        self.enabled_apps.retain(|id| seen.insert(id.clone()));
        self
    }

    pub fn is_app_enabled(&self, app: &str) -> bool {
        self.enabled_apps.iter().any(|id| id == app)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_secs
                .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS),
        )
    }

    pub fn set_app_enabled(&mut self, app: &str, enabled: bool) {
        if enabled {
            if !self.is_app_enabled(app) {
                self.enabled_apps.push(app.to_string());
            }
        } else {
            self.enabled_apps.retain(|id| id != app);
        }
    }
}
