//! Service façade used by frontends.
//!
//! Wraps the engine with settings handling, automatic persistence of
//! mutations, export/import and conflict resolution.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::BackupEntry;
use crate::config::{Settings, SettingsStore};
use crate::context::AppContext;
use crate::error::{SyncError, SyncResult};
use crate::fs::{atomic_write, read_optional};
use crate::registry::ServerView;
use crate::scheduler::RefreshScheduler;
use crate::sync::{AppSyncResult, MutexExt, SyncEngine};
use crate::types::{Application, McpServer};

pub const EXPORT_VERSION: u32 = 1;

/// Answer to a conflict or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Drop in-memory edits and re-read the file.
    Discard,
    /// Write the in-memory state over whatever is on disk.
    Overwrite,
}

/// Portable snapshot of every application's servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub applications: BTreeMap<String, Vec<McpServer>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedImport {
    pub app: String,
    pub server: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Servers added or replaced.
    pub imported: usize,
    pub skipped: Vec<SkippedImport>,
    /// Persistence result per touched application.
    pub results: Vec<AppSyncResult>,
}

pub struct McpSyncService {
    ctx: AppContext,
    engine: Arc<SyncEngine>,
    store: SettingsStore,
    settings: Mutex<Settings>,
}

impl McpSyncService {
    /// Load settings, build the engine and read every enabled application.
    pub fn open(ctx: AppContext) -> SyncResult<Self> {
        let store = ctx.settings_store();
        let settings = store.load()?;
        let engine = Arc::new(ctx.sync_engine(&settings));
        let apps = engine.refresh_all();
        tracing::info!(
            apps = apps.len(),
            detected = apps.iter().filter(|a| a.detected).count(),
            "loaded applications"
        );
        Ok(Self {
            ctx,
            engine,
            store,
            settings: Mutex::new(settings),
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn engine(&self) -> Arc<SyncEngine> {
        Arc::clone(&self.engine)
    }

    /// Scheduler for the periodic refresh at the configured interval.
    pub fn scheduler(&self) -> RefreshScheduler {
        RefreshScheduler::new(self.engine(), self.get_settings().refresh_interval())
    }

    fn auto_sync(&self) -> bool {
        self.get_settings().auto_sync
    }

    /// Persist one application now, or report it pending when automatic
    /// sync is off.
    fn persist(&self, app: &str) -> AppSyncResult {
        if self.auto_sync() {
            self.engine.sync_one(app)
        } else {
            AppSyncResult::pending(app)
        }
    }

    fn persist_many(&self, apps: &[&str]) -> Vec<AppSyncResult> {
        if self.auto_sync() {
            self.engine.sync_many(apps)
        } else {
            apps.iter().map(|app| AppSyncResult::pending(app)).collect()
        }
    }

    fn ensure_managed(&self, app: &str) -> SyncResult<()> {
        if self.engine.adapters().get(app).is_none() || !self.engine.is_managed(app) {
            return Err(SyncError::UnknownApp(app.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Servers and applications
    // ------------------------------------------------------------------

    pub fn get_servers(&self) -> Vec<ServerView> {
        self.engine.server_views()
    }

    pub fn get_applications(&self) -> Vec<Application> {
        self.engine.applications()
    }

    /// Setting a server to the value it already has leaves the application
    /// alone and reports `Unchanged`.
    pub fn toggle_server(&self, server: &str, app: &str, enabled: bool) -> SyncResult<AppSyncResult> {
        self.ensure_managed(app)?;
        if !self.engine.toggle(server, app, enabled)? {
            return Ok(AppSyncResult::unchanged(app));
        }
        Ok(self.persist(app))
    }

    /// Results follow application id order. Only applications whose flag
    /// actually changed are persisted.
    pub fn toggle_all(&self, server: &str, enabled: bool) -> SyncResult<Vec<AppSyncResult>> {
        let changes = self.engine.toggle_all(server, enabled)?;
        let changed: Vec<&str> = changes
            .iter()
            .filter(|(_, changed)| *changed)
            .map(|(app, _)| app.as_str())
            .collect();
        let mut persisted: BTreeMap<String, AppSyncResult> = self
            .persist_many(&changed)
            .into_iter()
            .map(|result| (result.app.clone(), result))
            .collect();
        Ok(changes
            .into_iter()
            .map(|(app, _)| {
                persisted
                    .remove(&app)
                    .unwrap_or_else(|| AppSyncResult::unchanged(&app))
            })
            .collect())
    }

    pub fn sync_application(&self, app: &str) -> AppSyncResult {
        self.engine.sync_one(app)
    }

    pub fn sync_all(&self) -> Vec<AppSyncResult> {
        self.engine.sync_all()
    }

    pub fn refresh(&self) -> Vec<Application> {
        self.engine.refresh_all()
    }

    pub fn get_server_config(&self, server: &str, app: &str) -> SyncResult<McpServer> {
        self.ensure_managed(app)?;
        self.engine.server(server, app)
    }

    /// Replace an existing server's definition.
    pub fn save_server_config(&self, app: &str, server: McpServer) -> SyncResult<AppSyncResult> {
        self.ensure_managed(app)?;
        self.engine.server(&server.name, app)?;
        self.engine.upsert_server(app, server)?;
        Ok(self.persist(app))
    }

    pub fn create_server(&self, app: &str, server: McpServer) -> SyncResult<AppSyncResult> {
        self.ensure_managed(app)?;
        self.engine.create_server(app, server)?;
        Ok(self.persist(app))
    }

    pub fn remove_server(&self, app: &str, server: &str) -> SyncResult<AppSyncResult> {
        self.ensure_managed(app)?;
        self.engine.remove_server(app, server)?;
        Ok(self.persist(app))
    }

    pub fn resolve_conflict(&self, app: &str, resolution: Resolution) -> SyncResult<AppSyncResult> {
        self.ensure_managed(app)?;
        match resolution {
            Resolution::Discard => {
                self.engine.discard_and_reread(app)?;
                Ok(AppSyncResult::success(app))
            }
            Resolution::Overwrite => Ok(self.engine.force_overwrite(app)),
        }
    }

    // ------------------------------------------------------------------
    // Backups
    // ------------------------------------------------------------------

    pub fn create_backup(&self) -> Vec<BackupEntry> {
        self.engine.create_backups()
    }

    pub fn list_backups(&self, app: &str) -> SyncResult<Vec<BackupEntry>> {
        self.engine.list_backups(app)
    }

    pub fn restore_backup(&self, app: &str, seq: u64) -> SyncResult<Application> {
        self.ensure_managed(app)?;
        self.engine.restore_backup(app, seq)
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Write every detected application's servers to a JSON bundle.
    pub fn export_config(&self, path: &Path) -> SyncResult<ExportBundle> {
        let mut applications = BTreeMap::new();
        for app in self.engine.applications() {
            if !app.detected {
                continue;
            }
            applications.insert(app.name.clone(), self.engine.app_servers(&app.name)?);
        }
        let bundle = ExportBundle {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            applications,
        };
        let bytes = serde_json::to_vec_pretty(&bundle)
            .map_err(|e| SyncError::Settings(format!("failed to serialize export: {e}")))?;
        atomic_write(path, &bytes)?;
        tracing::info!(path = %path.display(), apps = bundle.applications.len(), "exported servers");
        Ok(bundle)
    }

    /// Upsert servers from a bundle into known, enabled applications.
    ///
    /// Invalid servers and unknown or disabled applications are skipped and
    /// reported; the rest are merged and persisted per application.
    pub fn import_config(&self, path: &Path) -> SyncResult<ImportSummary> {
        let bytes = read_optional(path)?.ok_or_else(|| SyncError::ConfigNotFound {
            app: "import".to_string(),
            path: path.to_path_buf(),
        })?;
        let bundle: ExportBundle = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::parse("import", path, e.to_string()))?;
        if bundle.version > EXPORT_VERSION {
            return Err(SyncError::parse(
                "import",
                path,
                format!("unsupported bundle version {}", bundle.version),
            ));
        }

        let mut summary = ImportSummary::default();
        let mut touched: Vec<String> = Vec::new();
        for (app, servers) in bundle.applications {
            let skip_reason = match self.ensure_managed(&app) {
                Ok(()) => None,
                Err(_) if self.engine.adapters().get(&app).is_some() => {
                    Some("application not enabled".to_string())
                }
                Err(_) => Some("unknown application".to_string()),
            };
            for server in servers {
                let reason = match &skip_reason {
                    Some(reason) => Some(reason.clone()),
                    None => self
                        .engine
                        .upsert_server(&app, server.clone())
                        .err()
                        .map(|e| e.to_string()),
                };
                match reason {
                    Some(reason) => summary.skipped.push(SkippedImport {
                        app: app.clone(),
                        server: server.name,
                        reason,
                    }),
                    None => {
                        summary.imported += 1;
                        if !touched.contains(&app) {
                            touched.push(app.clone());
                        }
                    }
                }
            }
        }

        let apps: Vec<&str> = touched.iter().map(String::as_str).collect();
        summary.results = self.persist_many(&apps);
        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped.len(),
            "imported servers"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn get_settings(&self) -> Settings {
        self.settings.lock_or_recover().clone()
    }

    /// Persist settings and apply them. Applications that became enabled or
    /// whose path changed are re-read; others keep their in-memory state.
    pub fn save_settings(&self, settings: Settings) -> SyncResult<Settings> {
        let settings = settings.normalized();
        self.store.save(&settings)?;

        let previous = {
            let mut current = self.settings.lock_or_recover();
            std::mem::replace(&mut *current, settings.clone())
        };
        self.engine.apply_settings(&settings);

        for app in &settings.enabled_apps {
            let newly_enabled = !previous.is_app_enabled(app);
            let moved = previous.path_overrides.get(app) != settings.path_overrides.get(app);
            if (newly_enabled || moved)
                && let Err(err) = self.engine.refresh_one(app)
            {
                tracing::warn!(app = app.as_str(), error = %err, "failed to read after settings change");
            }
        }
        Ok(settings)
    }
}
