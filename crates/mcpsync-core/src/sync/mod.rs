//! Sync coordinator.
//!
//! [`SyncEngine`] owns the in-memory registry and the per-application sync
//! state. It enforces read-then-write-then-verify: a write goes ahead only if
//! the file's current hash equals the one recorded at the last read. Files
//! changed behind the engine's back put the application into `conflict`,
//! which only an explicit re-read or overwrite clears.
//!
//! Locking: engine state sits behind one mutex that is never held across
//! file I/O. File operations for one application are serialized through its
//! [`AppSlot`]; different applications run in parallel.

mod lock;
mod result;
mod slot;

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::thread;

use chrono::Utc;

use crate::adapter::{AdapterContext, AdapterRegistry, AppAdapter};
use crate::backup::{BackupEntry, BackupManager};
use crate::config::Settings;
use crate::error::{SyncError, SyncResult};
use crate::fs::{hash_bytes, read_optional};
use crate::registry::{ConsolidatedServer, ServerRegistry, ServerView};
use crate::types::{Application, McpServer, SyncRecord, SyncStatus};

pub(crate) use lock::MutexExt;
pub use result::{AppSyncResult, RefreshReport, SyncOutcome};
pub use slot::AppSlot;

const DISAPPEARED: &str = "config file disappeared since it was last read";

#[derive(Debug, Clone)]
struct AppState {
    application: Application,
    record: Option<SyncRecord>,
    /// Bumped on every in-memory change; lets a finished write tell whether
    /// it persisted the latest edits.
    revision: u64,
}

impl AppState {
    fn new(application: Application) -> Self {
        Self {
            application,
            record: None,
            revision: 0,
        }
    }
}

#[derive(Debug)]
struct EngineState {
    ctx: AdapterContext,
    enabled_apps: Vec<String>,
    registry: ServerRegistry,
    apps: BTreeMap<String, AppState>,
}

enum PeriodicStep {
    Synced(AppSyncResult),
    Reread(Application),
    Skipped(String),
}

#[derive(Debug)]
pub struct SyncEngine {
    adapters: AdapterRegistry,
    backups: BackupManager,
    slots: BTreeMap<&'static str, AppSlot>,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    pub fn new(
        adapters: AdapterRegistry,
        ctx: AdapterContext,
        backups: BackupManager,
        enabled_apps: Vec<String>,
    ) -> Self {
        let slots = adapters.ids().into_iter().map(|id| (id, AppSlot::new())).collect();
        Self {
            adapters,
            backups,
            slots,
            state: Mutex::new(EngineState {
                ctx,
                enabled_apps,
                registry: ServerRegistry::new(),
                apps: BTreeMap::new(),
            }),
        }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn adapter_context(&self) -> AdapterContext {
        self.state.lock_or_recover().ctx.clone()
    }

    /// Take new path overrides, enabled applications and backup retention.
    ///
    /// Applications that are no longer enabled are dropped from memory.
    /// Callers should refresh afterwards so moved files are re-read.
    pub fn apply_settings(&self, settings: &Settings) {
        self.backups.set_retention(settings.backup_retention);
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        state.ctx = state
            .ctx
            .clone()
            .with_overrides(settings.path_overrides.clone());
        state.enabled_apps = settings.enabled_apps.clone();

        let kept: BTreeMap<String, Vec<McpServer>> = state
            .registry
            .apps()
            .filter(|app| settings.is_app_enabled(app))
            .map(|app| (app.to_string(), state.registry.app_servers(app).to_vec()))
            .collect();
        state.registry.rebuild(kept);
        state.apps.retain(|app, _| settings.is_app_enabled(app));
    }

    fn resolve(&self, app: &str) -> SyncResult<(&dyn AppAdapter, &AppSlot)> {
        let adapter = self
            .adapters
            .get(app)
            .ok_or_else(|| SyncError::UnknownApp(app.to_string()))?;
        let slot = self
            .slots
            .get(adapter.id())
            .ok_or_else(|| SyncError::UnknownApp(app.to_string()))?;
        Ok((adapter, slot))
    }

    /// Adapters for the enabled applications, in registry order.
    fn managed(&self) -> Vec<&dyn AppAdapter> {
        let enabled = self.state.lock_or_recover().enabled_apps.clone();
        self.adapters.filter_enabled(&enabled)
    }

    pub fn is_managed(&self, app: &str) -> bool {
        self.state
            .lock_or_recover()
            .enabled_apps
            .iter()
            .any(|id| id == app)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every enabled application. Applications never read report their
    /// detection result with status `unsynced`.
    pub fn applications(&self) -> Vec<Application> {
        let managed = self.managed();
        let (ctx, known) = {
            let state = self.state.lock_or_recover();
            let known: BTreeMap<String, Application> = state
                .apps
                .iter()
                .map(|(id, s)| (id.clone(), s.application.clone()))
                .collect();
            (state.ctx.clone(), known)
        };
        managed
            .into_iter()
            .map(|adapter| {
                known
                    .get(adapter.id())
                    .cloned()
                    .unwrap_or_else(|| adapter.detect(&ctx))
            })
            .collect()
    }

    pub fn application(&self, app: &str) -> SyncResult<Application> {
        let (adapter, _) = self.resolve(app)?;
        Ok(self.current_application(adapter))
    }

    /// Flat server view across enabled applications.
    pub fn server_views(&self) -> Vec<ServerView> {
        let state = self.state.lock_or_recover();
        state
            .registry
            .entries()
            .into_iter()
            .filter(|view| state.enabled_apps.contains(&view.application))
            .collect()
    }

    pub fn consolidated(&self) -> Vec<ConsolidatedServer> {
        self.state
            .lock_or_recover()
            .registry
            .servers()
            .cloned()
            .collect()
    }

    pub fn app_servers(&self, app: &str) -> SyncResult<Vec<McpServer>> {
        self.resolve(app)?;
        Ok(self
            .state
            .lock_or_recover()
            .registry
            .app_servers(app)
            .to_vec())
    }

    pub fn server(&self, server: &str, app: &str) -> SyncResult<McpServer> {
        self.resolve(app)?;
        self.state
            .lock_or_recover()
            .registry
            .get(server, app)
            .cloned()
            .ok_or_else(|| SyncError::UnknownServer {
                server: server.to_string(),
                app: app.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // In-memory edits
    // ------------------------------------------------------------------

    /// Set one application's flag for a server. Returns whether it changed.
    pub fn toggle(&self, server: &str, app: &str, enabled: bool) -> SyncResult<bool> {
        self.resolve(app)?;
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        let changed = state.registry.toggle(server, app, enabled)?;
        if changed {
            mark_dirty(state, app);
            tracing::debug!(app, server, enabled, "toggled server");
        }
        Ok(changed)
    }

    /// Set a server's flag in every application that has it.
    pub fn toggle_all(&self, server: &str, enabled: bool) -> SyncResult<Vec<(String, bool)>> {
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        let changes = state.registry.toggle_all(server, enabled)?;
        for (app, changed) in &changes {
            if *changed {
                mark_dirty(state, app);
            }
        }
        tracing::debug!(server, enabled, apps = changes.len(), "toggled server everywhere");
        Ok(changes)
    }

    /// Add a new server to an application after validating it.
    pub fn create_server(&self, app: &str, server: McpServer) -> SyncResult<()> {
        let (adapter, _) = self.resolve(app)?;
        self.ensure_loaded(app)?;
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        adapter.validate(&server, state.registry.app_servers(app))?;
        state.registry.upsert(app, server);
        mark_dirty(state, app);
        Ok(())
    }

    /// Replace a server's definition, or add it if the name is new.
    /// Returns `true` when the server was added.
    pub fn upsert_server(&self, app: &str, server: McpServer) -> SyncResult<bool> {
        self.resolve(app)?;
        crate::adapter::validate_server(&server)?;
        self.ensure_loaded(app)?;
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        let inserted = state.registry.upsert(app, server);
        mark_dirty(state, app);
        Ok(inserted)
    }

    pub fn remove_server(&self, app: &str, server: &str) -> SyncResult<McpServer> {
        self.resolve(app)?;
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        let removed = state.registry.remove(server, app)?;
        mark_dirty(state, app);
        Ok(removed)
    }

    fn ensure_loaded(&self, app: &str) -> SyncResult<()> {
        let loaded = self
            .state
            .lock_or_recover()
            .apps
            .get(app)
            .is_some_and(|s| s.record.is_some());
        if loaded {
            return Ok(());
        }
        self.refresh_one(app).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Detect and read one application.
    pub fn refresh_one(&self, app: &str) -> SyncResult<Application> {
        let (adapter, slot) = self.resolve(app)?;
        let _guard = slot.lock();
        self.reread_locked(adapter, None, false)
    }

    /// Detect and read every enabled application in parallel.
    pub fn refresh_all(&self) -> Vec<Application> {
        let managed = self.managed();
        let results: Vec<Application> = thread::scope(|scope| {
            let handles: Vec<_> = managed
                .iter()
                .map(|adapter| {
                    let adapter = *adapter;
                    scope.spawn(move || {
                        let (_, slot) = self.resolve(adapter.id())?;
                        let _guard = slot.lock();
                        self.reread_locked(adapter, None, false)
                    })
                })
                .collect();
            handles
                .into_iter()
                .zip(&managed)
                .map(|(handle, adapter)| match handle.join() {
                    Ok(Ok(application)) => application,
                    Ok(Err(_)) | Err(_) => self.current_application(*adapter),
                })
                .collect()
        });
        tracing::debug!(apps = results.len(), "refreshed applications");
        results
    }

    /// Drop in-memory edits for an application and read it again. Clears
    /// `conflict` and `error`.
    pub fn discard_and_reread(&self, app: &str) -> SyncResult<Application> {
        tracing::info!(app, "discarding in-memory changes");
        self.refresh_one(app)
    }

    fn current_application(&self, adapter: &dyn AppAdapter) -> Application {
        let ctx = {
            let state = self.state.lock_or_recover();
            if let Some(app_state) = state.apps.get(adapter.id()) {
                return app_state.application.clone();
            }
            state.ctx.clone()
        };
        adapter.detect(&ctx)
    }

    /// Read an application's file and replace its in-memory servers.
    ///
    /// Caller holds the application's slot lock. With `expected_revision`,
    /// the result is only applied if no edit happened since it was captured.
    /// With `vanished_is_error`, a file that existed at the last read and is
    /// now gone puts the application into `error` instead of emptying it.
    fn reread_locked(
        &self,
        adapter: &dyn AppAdapter,
        expected_revision: Option<u64>,
        vanished_is_error: bool,
    ) -> SyncResult<Application> {
        let app = adapter.id();
        let ctx = self.adapter_context();
        let mut application = adapter.detect(&ctx);

        match adapter.read(&ctx) {
            Ok(snapshot) => {
                let mut guard = self.state.lock_or_recover();
                let state = &mut *guard;
                let app_state = state
                    .apps
                    .entry(app.to_string())
                    .or_insert_with(|| AppState::new(application.clone()));

                if expected_revision.is_some_and(|rev| rev != app_state.revision) {
                    tracing::debug!(app, "edited during refresh, keeping in-memory state");
                    return Ok(app_state.application.clone());
                }

                let had_file = app_state
                    .record
                    .as_ref()
                    .is_some_and(|r| r.content_hash.is_some());
                if vanished_is_error && had_file && snapshot.content_hash.is_none() {
                    tracing::warn!(app, path = %application.config_path.display(), "config file disappeared");
                    app_state.application.detected = false;
                    app_state.application.sync_status = SyncStatus::Error;
                    app_state.application.last_error = Some(DISAPPEARED.to_string());
                    return Ok(app_state.application.clone());
                }

                application.server_count = snapshot.servers.len();
                application.sync_status = SyncStatus::Synced;
                application.last_sync = Some(Utc::now());
                app_state.record = Some(SyncRecord::new(app, snapshot.content_hash));
                app_state.revision += 1;
                app_state.application = application.clone();
                state.registry.set_app_servers(app, snapshot.servers);
                Ok(application)
            }
            Err(err) => {
                tracing::warn!(app, error = %err, "failed to read config");
                let mut state = self.state.lock_or_recover();
                let app_state = state
                    .apps
                    .entry(app.to_string())
                    .or_insert_with(|| AppState::new(application.clone()));
                application.server_count = app_state.application.server_count;
                application.last_sync = app_state.application.last_sync;
                application.sync_status = SyncStatus::Error;
                application.last_error = Some(err.to_string());
                app_state.record = None;
                app_state.application = application;
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Persist an application's in-memory servers.
    ///
    /// Writes only if the file is unchanged since the last read; otherwise
    /// the application goes to `conflict` and the in-memory edit is kept. If
    /// a newer sync request for the same application is already queued, this
    /// one returns `Superseded` and leaves the write to it.
    pub fn sync_one(&self, app: &str) -> AppSyncResult {
        let (adapter, slot) = match self.resolve(app) {
            Ok(found) => found,
            Err(err) => return AppSyncResult::error(app, err.to_string()),
        };
        let ticket = slot.issue();
        let _guard = slot.lock();
        if !slot.is_latest(ticket) {
            tracing::debug!(app, ticket, "sync superseded by newer request");
            return AppSyncResult::superseded(app);
        }
        self.write_locked(adapter, true)
    }

    /// Sync every enabled application that is detected, pending, or awaiting
    /// resolution, in parallel. An application whose file vanished is
    /// reported as an error rather than left out. Failures are reported per
    /// application; nothing fails fast.
    pub fn sync_all(&self) -> Vec<AppSyncResult> {
        let targets: Vec<&dyn AppAdapter> = {
            let managed = self.managed();
            let state = self.state.lock_or_recover();
            managed
                .into_iter()
                .filter(|adapter| {
                    state.apps.get(adapter.id()).is_some_and(|s| {
                        s.application.detected
                            || s.application.sync_status == SyncStatus::Pending
                            || s.application.sync_status.needs_resolution()
                    })
                })
                .collect()
        };

        let ids: Vec<&str> = targets.iter().map(|adapter| adapter.id()).collect();
        self.sync_many(&ids)
    }

    /// Sync the given applications in parallel, one result per id.
    pub fn sync_many(&self, apps: &[&str]) -> Vec<AppSyncResult> {
        thread::scope(|scope| {
            let handles: Vec<_> = apps
                .iter()
                .map(|app| scope.spawn(move || self.sync_one(app)))
                .collect();
            handles
                .into_iter()
                .zip(apps)
                .map(|(handle, app)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| AppSyncResult::error(app, "sync task panicked"))
                })
                .collect()
        })
    }

    /// Write the in-memory servers without comparing hashes. This is the
    /// explicit "overwrite" answer to a conflict.
    pub fn force_overwrite(&self, app: &str) -> AppSyncResult {
        let (adapter, slot) = match self.resolve(app) {
            Ok(found) => found,
            Err(err) => return AppSyncResult::error(app, err.to_string()),
        };
        let _guard = slot.lock();
        tracing::info!(app, "overwriting config regardless of on-disk changes");
        self.write_locked(adapter, false)
    }

    fn write_locked(&self, adapter: &dyn AppAdapter, check_hash: bool) -> AppSyncResult {
        let app = adapter.id();
        let (ctx, servers, record, revision, status) = {
            let state = self.state.lock_or_recover();
            let app_state = state.apps.get(app);
            (
                state.ctx.clone(),
                state.registry.app_servers(app).to_vec(),
                app_state.and_then(|s| s.record.clone()),
                app_state.map(|s| s.revision).unwrap_or(0),
                app_state.map(|s| s.application.sync_status),
            )
        };
        let path = adapter.config_path(&ctx);

        if check_hash && status == Some(SyncStatus::Conflict) {
            return AppSyncResult::conflict(app);
        }

        let Some(record) = record else {
            return self.fail(app, "config has not been read yet; refresh first");
        };

        let current = match read_optional(&path) {
            Ok(current) => current,
            Err(err) => return self.fail(app, err.to_string()),
        };

        if check_hash {
            let current_hash = current.as_deref().map(hash_bytes);
            match (&record.content_hash, &current_hash) {
                (Some(_), None) => {
                    tracing::warn!(app, path = %path.display(), "config file disappeared before write");
                    return self.fail(app, DISAPPEARED);
                }
                (recorded, now) if recorded != now => {
                    let conflict = SyncError::WriteConflict {
                        app: app.to_string(),
                        path: path.clone(),
                    };
                    tracing::warn!(app, "{conflict}");
                    self.set_status(app, SyncStatus::Conflict, Some(conflict.to_string()));
                    return AppSyncResult::conflict(app);
                }
                _ => {}
            }
        }

        if current.is_none() && servers.is_empty() {
            self.finish_write(app, None, revision);
            return AppSyncResult::success(app);
        }

        let rendered = match adapter.render(&path, current.as_deref(), &servers) {
            Ok(rendered) => rendered,
            Err(err) => return self.fail(app, err.to_string()),
        };

        if current.as_deref() == Some(rendered.as_slice()) {
            tracing::debug!(app, "config already up to date");
        } else {
            if let Some(existing) = &current
                && let Err(err) = self.backups.snapshot(app, &path, existing)
            {
                tracing::error!(app, error = %err, "backup failed, write aborted");
                return self.fail(app, err.to_string());
            }
            if let Err(err) = adapter.commit(&path, &rendered) {
                tracing::error!(app, error = %err, "failed to write config");
                return self.fail(app, err.to_string());
            }
        }

        self.finish_write(app, Some(hash_bytes(&rendered)), revision);
        AppSyncResult::success(app)
    }

    fn finish_write(&self, app: &str, content_hash: Option<String>, revision: u64) {
        let mut guard = self.state.lock_or_recover();
        let state = &mut *guard;
        let server_count = state.registry.app_servers(app).len();
        let Some(app_state) = state.apps.get_mut(app) else {
            return;
        };
        app_state.application.detected = content_hash.is_some();
        app_state.record = Some(SyncRecord::new(app, content_hash));
        app_state.application.server_count = server_count;
        app_state.application.last_sync = Some(Utc::now());
        app_state.application.last_error = None;
        app_state.application.sync_status = if app_state.revision == revision {
            SyncStatus::Synced
        } else {
            SyncStatus::Pending
        };
    }

    fn set_status(&self, app: &str, status: SyncStatus, message: Option<String>) {
        let mut state = self.state.lock_or_recover();
        if let Some(app_state) = state.apps.get_mut(app) {
            app_state.application.sync_status = status;
            app_state.application.last_error = message;
        }
    }

    fn fail(&self, app: &str, message: impl Into<String>) -> AppSyncResult {
        let message = message.into();
        self.set_status(app, SyncStatus::Error, Some(message.clone()));
        AppSyncResult::error(app, message)
    }

    // ------------------------------------------------------------------
    // Backups
    // ------------------------------------------------------------------

    /// Back up every enabled application whose file exists.
    pub fn create_backups(&self) -> Vec<BackupEntry> {
        let ctx = self.adapter_context();
        let mut entries = Vec::new();
        for adapter in self.managed() {
            let Ok((_, slot)) = self.resolve(adapter.id()) else {
                continue;
            };
            let _guard = slot.lock();
            match self
                .backups
                .snapshot_file(adapter.id(), &adapter.config_path(&ctx))
            {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(app = adapter.id(), error = %err, "manual backup failed");
                }
            }
        }
        entries
    }

    pub fn list_backups(&self, app: &str) -> SyncResult<Vec<BackupEntry>> {
        self.resolve(app)?;
        self.backups.list(app)
    }

    /// Restore a backup over the live file, then re-read it.
    pub fn restore_backup(&self, app: &str, seq: u64) -> SyncResult<Application> {
        let (adapter, slot) = self.resolve(app)?;
        let entry = self.backups.get(app, seq)?;
        let _guard = slot.lock();
        self.backups
            .restore(adapter, &self.adapter_context(), &entry)?;
        self.reread_locked(adapter, None, false)
    }

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------

    /// One pass of the periodic refresh: pending applications are synced,
    /// settled ones re-read, and ones awaiting resolution left alone.
    pub fn periodic_refresh(&self) -> RefreshReport {
        let managed = self.managed();
        let steps: Vec<PeriodicStep> = thread::scope(|scope| {
            let handles: Vec<_> = managed
                .iter()
                .map(|adapter| {
                    let adapter = *adapter;
                    scope.spawn(move || self.periodic_step(adapter))
                })
                .collect();
            handles
                .into_iter()
                .zip(&managed)
                .map(|(handle, adapter)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| PeriodicStep::Skipped(adapter.id().to_string()))
                })
                .collect()
        });

        let mut report = RefreshReport {
            at: Utc::now(),
            synced: Vec::new(),
            reread: Vec::new(),
            skipped: Vec::new(),
        };
        for step in steps {
            match step {
                PeriodicStep::Synced(result) => report.synced.push(result),
                PeriodicStep::Reread(application) => report.reread.push(application),
                PeriodicStep::Skipped(app) => report.skipped.push(app),
            }
        }
        report
    }

    fn periodic_step(&self, adapter: &dyn AppAdapter) -> PeriodicStep {
        let app = adapter.id();
        let (status, revision) = {
            let state = self.state.lock_or_recover();
            match state.apps.get(app) {
                Some(s) => (Some(s.application.sync_status), Some(s.revision)),
                None => (None, None),
            }
        };
        match status {
            Some(status) if status.needs_resolution() => PeriodicStep::Skipped(app.to_string()),
            Some(SyncStatus::Pending) => PeriodicStep::Synced(self.sync_one(app)),
            _ => {
                let Ok((_, slot)) = self.resolve(app) else {
                    return PeriodicStep::Skipped(app.to_string());
                };
                let _guard = slot.lock();
                let application = self
                    .reread_locked(adapter, revision, true)
                    .unwrap_or_else(|_| self.current_application(adapter));
                PeriodicStep::Reread(application)
            }
        }
    }
}

/// Record an in-memory edit. Conflict and error stay until resolved.
fn mark_dirty(state: &mut EngineState, app: &str) {
    let server_count = state.registry.app_servers(app).len();
    if let Some(app_state) = state.apps.get_mut(app) {
        app_state.revision += 1;
        app_state.application.server_count = server_count;
        if !app_state.application.sync_status.needs_resolution() {
            app_state.application.sync_status = SyncStatus::Pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> SyncEngine {
        let adapters = AdapterRegistry::with_default_adapters();
        let enabled = adapters.ids().into_iter().map(str::to_string).collect();
        SyncEngine::new(
            adapters,
            AdapterContext::rooted_at(tmp.path()),
            BackupManager::with_default_retention(tmp.path().join("backups")),
            enabled,
        )
    }

    fn write_cursor(tmp: &TempDir, body: &str) -> std::path::PathBuf {
        let path = tmp.path().join("home/.cursor/mcp.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn unknown_app_is_reported() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        assert!(matches!(
            engine.refresh_one("notepad"),
            Err(SyncError::UnknownApp(_))
        ));
        assert!(engine.sync_one("notepad").is_error());
    }

    #[test]
    fn toggle_marks_pending_then_sync_settles() {
        let tmp = TempDir::new().unwrap();
        write_cursor(&tmp, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
        let engine = engine(&tmp);
        engine.refresh_one("cursor").unwrap();

        assert!(engine.toggle("fs", "cursor", false).unwrap());
        assert_eq!(
            engine.application("cursor").unwrap().sync_status,
            SyncStatus::Pending
        );

        assert!(engine.sync_one("cursor").is_success());
        let app = engine.application("cursor").unwrap();
        assert_eq!(app.sync_status, SyncStatus::Synced);
        assert!(app.last_error.is_none());
    }

    #[test]
    fn unchanged_sync_does_not_back_up() {
        let tmp = TempDir::new().unwrap();
        let body = "{\n  \"mcpServers\": {\n    \"fs\": {\n      \"command\": \"npx\"\n    }\n  }\n}\n";
        write_cursor(&tmp, body);
        let engine = engine(&tmp);
        engine.refresh_one("cursor").unwrap();

        assert!(engine.sync_one("cursor").is_success());
        assert!(engine.list_backups("cursor").unwrap().is_empty());
    }

    #[test]
    fn queued_sync_is_superseded_by_newer_request() {
        let tmp = TempDir::new().unwrap();
        write_cursor(&tmp, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
        let engine = engine(&tmp);
        engine.refresh_one("cursor").unwrap();
        engine.toggle("fs", "cursor", false).unwrap();

        let (_, slot) = engine.resolve("cursor").unwrap();
        let base = slot.latest();
        let guard = slot.lock();
        let result = thread::scope(|scope| {
            let queued = scope.spawn(|| engine.sync_one("cursor"));
            while slot.latest() == base {
                thread::yield_now();
            }
            // A newer request arrives while the first one waits.
            slot.issue();
            drop(guard);
            queued.join().unwrap()
        });

        assert_eq!(result.outcome, SyncOutcome::Superseded);
        assert_eq!(
            engine.application("cursor").unwrap().sync_status,
            SyncStatus::Pending
        );
    }

    #[test]
    fn conflict_is_sticky_until_resolved() {
        let tmp = TempDir::new().unwrap();
        let path = write_cursor(&tmp, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
        let engine = engine(&tmp);
        engine.refresh_one("cursor").unwrap();
        engine.toggle("fs", "cursor", false).unwrap();

        std::fs::write(&path, r#"{"mcpServers": {"fs": {"command": "uvx"}}}"#).unwrap();
        assert!(engine.sync_one("cursor").is_conflict());

        // Reverting the external edit does not silently clear the conflict.
        std::fs::write(&path, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#).unwrap();
        assert!(engine.sync_one("cursor").is_conflict());

        engine.discard_and_reread("cursor").unwrap();
        let app = engine.application("cursor").unwrap();
        assert_eq!(app.sync_status, SyncStatus::Synced);
        assert!(engine.server("fs", "cursor").unwrap().enabled);
    }

    #[test]
    fn periodic_refresh_skips_conflicts() {
        let tmp = TempDir::new().unwrap();
        let path = write_cursor(&tmp, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
        let engine = engine(&tmp);
        engine.refresh_all();
        engine.toggle("fs", "cursor", false).unwrap();
        std::fs::write(&path, r#"{"mcpServers": {}}"#).unwrap();
        assert!(engine.sync_one("cursor").is_conflict());

        let report = engine.periodic_refresh();
        assert_eq!(report.skipped, vec!["cursor".to_string()]);
        assert_eq!(report.reread.len(), 6);
    }
}
