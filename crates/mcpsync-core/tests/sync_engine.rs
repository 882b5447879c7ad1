//! Integration tests for the sync coordinator.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use mcpsync_core::adapter::{AdapterContext, AdapterRegistry};
use mcpsync_core::backup::BackupManager;
use mcpsync_core::sync::{SyncEngine, SyncOutcome};
use mcpsync_core::types::SyncStatus;

fn engine(temp: &TempDir) -> SyncEngine {
    let adapters = AdapterRegistry::with_default_adapters();
    let enabled = adapters.ids().into_iter().map(str::to_string).collect();
    SyncEngine::new(
        adapters,
        AdapterContext::rooted_at(temp.path()),
        BackupManager::new(temp.path().join("state/backups"), 10),
        enabled,
    )
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn cursor_path(temp: &TempDir) -> PathBuf {
    temp.path().join("home/.cursor/mcp.json")
}

fn claude_desktop_path(temp: &TempDir) -> PathBuf {
    temp.path()
        .join("app-support/Claude/claude_desktop_config.json")
}

fn gemini_path(temp: &TempDir) -> PathBuf {
    temp.path().join("home/.gemini/settings.json")
}

#[test]
fn disabling_weather_leaves_other_servers_alone() {
    let temp = TempDir::new().unwrap();
    let path = claude_desktop_path(&temp);
    write(
        &path,
        r#"{
  "mcpServers": {
    "filesystem": {"command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "/Users/me"]},
    "weather": {"command": "uvx", "args": ["weather-mcp"], "env": {"API_KEY": "k"}},
    "broken": {"command": "missing-binary", "disabled": true}
  }
}"#,
    );
    let before = read_json(&path);
    let engine = engine(&temp);
    engine.refresh_all();

    assert!(engine.toggle("weather", "claude-desktop", false).unwrap());
    let result = engine.sync_one("claude-desktop");
    assert_eq!(result.outcome, SyncOutcome::Success);

    let after = read_json(&path);
    assert_eq!(after["mcpServers"]["filesystem"], before["mcpServers"]["filesystem"]);
    assert_eq!(after["mcpServers"]["broken"], before["mcpServers"]["broken"]);
    assert_eq!(after["mcpServers"]["weather"]["disabled"], true);
    assert_eq!(after["mcpServers"]["weather"]["env"]["API_KEY"], "k");

    let reread = engine.refresh_one("claude-desktop").unwrap();
    assert_eq!(reread.sync_status, SyncStatus::Synced);
    assert!(!engine.server("weather", "claude-desktop").unwrap().enabled);
    assert!(engine.server("filesystem", "claude-desktop").unwrap().enabled);
    assert!(!engine.server("broken", "claude-desktop").unwrap().enabled);
}

#[test]
fn toggle_all_reports_vanished_file_separately() {
    let temp = TempDir::new().unwrap();
    let body = r#"{"mcpServers": {"filesystem": {"command": "npx"}}}"#;
    write(&cursor_path(&temp), body);
    write(&claude_desktop_path(&temp), body);
    write(&gemini_path(&temp), body);
    let engine = engine(&temp);
    engine.refresh_all();

    std::fs::remove_file(gemini_path(&temp)).unwrap();

    let changes = engine.toggle_all("filesystem", false).unwrap();
    assert_eq!(changes.len(), 3);
    let apps: Vec<&str> = changes.iter().map(|(app, _)| app.as_str()).collect();
    let results = engine.sync_many(&apps);

    let failed: Vec<_> = results.iter().filter(|r| r.is_error()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].app, "gemini-cli");
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 2);

    assert_eq!(read_json(&cursor_path(&temp))["mcpServers"]["filesystem"]["disabled"], true);
    assert_eq!(
        read_json(&claude_desktop_path(&temp))["mcpServers"]["filesystem"]["disabled"],
        true
    );
    assert!(!gemini_path(&temp).exists());
    assert_eq!(
        engine.application("gemini-cli").unwrap().sync_status,
        SyncStatus::Error
    );
}

#[test]
fn external_edit_causes_conflict_and_is_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let path = cursor_path(&temp);
    write(&path, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_one("cursor").unwrap();
    engine.toggle("fs", "cursor", false).unwrap();

    let external = r#"{"mcpServers": {"fs": {"command": "npx"}, "added-elsewhere": {"command": "x"}}}"#;
    std::fs::write(&path, external).unwrap();

    let result = engine.sync_one("cursor");
    assert!(result.is_conflict());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), external);

    let app = engine.application("cursor").unwrap();
    assert_eq!(app.sync_status, SyncStatus::Conflict);
    assert!(app.last_error.unwrap().contains("changed on disk"));
    // The in-memory edit survives.
    assert!(!engine.server("fs", "cursor").unwrap().enabled);
}

#[test]
fn file_created_after_read_is_a_conflict() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.refresh_one("cursor").unwrap();
    engine
        .create_server("cursor", mcpsync_core::types::McpServer::new("fs", "npx"))
        .unwrap();

    write(&cursor_path(&temp), r#"{"mcpServers": {}}"#);
    assert!(engine.sync_one("cursor").is_conflict());
}

#[test]
fn force_overwrite_resolves_conflict_with_backup() {
    let temp = TempDir::new().unwrap();
    let path = cursor_path(&temp);
    write(&path, r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_one("cursor").unwrap();
    engine.toggle("fs", "cursor", false).unwrap();
    std::fs::write(&path, r#"{"mcpServers": {"fs": {"command": "uvx"}}}"#).unwrap();
    assert!(engine.sync_one("cursor").is_conflict());

    let result = engine.force_overwrite("cursor");
    assert!(result.is_success());

    let doc = read_json(&path);
    assert_eq!(doc["mcpServers"]["fs"]["command"], "npx");
    assert_eq!(doc["mcpServers"]["fs"]["disabled"], true);
    assert_eq!(
        engine.application("cursor").unwrap().sync_status,
        SyncStatus::Synced
    );

    let backups = engine.list_backups("cursor").unwrap();
    assert_eq!(backups.len(), 1);
    assert!(std::fs::read_to_string(&backups[0].path).unwrap().contains("uvx"));
}

#[test]
fn same_value_toggle_changes_nothing() {
    let temp = TempDir::new().unwrap();
    write(&cursor_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_one("cursor").unwrap();
    let before = engine.application("cursor").unwrap();

    assert!(!engine.toggle("fs", "cursor", true).unwrap());

    let after = engine.application("cursor").unwrap();
    assert_eq!(after.sync_status, before.sync_status);
    assert_eq!(after.sync_status, SyncStatus::Synced);
    assert!(engine.server("fs", "cursor").unwrap().enabled);
}

#[test]
fn consolidated_view_has_one_entry_per_name() {
    let temp = TempDir::new().unwrap();
    write(
        &cursor_path(&temp),
        r#"{"mcpServers": {"fs": {"command": "npx"}, "git": {"command": "uvx"}}}"#,
    );
    write(
        &claude_desktop_path(&temp),
        r#"{"mcpServers": {"fs": {"command": "npx"}, "slack": {"command": "npx"}}}"#,
    );
    write(
        &temp.path().join("home/.codex/config.toml"),
        "[mcp_servers.git]\ncommand = \"uvx\"\n",
    );
    let engine = engine(&temp);
    engine.refresh_all();

    let names: Vec<_> = engine.consolidated().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["fs", "git", "slack"]);
    assert_eq!(engine.server_views().len(), 5);
}

#[test]
fn one_broken_app_does_not_block_others() {
    let temp = TempDir::new().unwrap();
    write(&cursor_path(&temp), "{broken");
    write(&gemini_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);

    let apps = engine.refresh_all();
    let cursor = apps.iter().find(|a| a.name == "cursor").unwrap();
    assert_eq!(cursor.sync_status, SyncStatus::Error);
    assert!(cursor.last_error.is_some());
    let gemini = apps.iter().find(|a| a.name == "gemini-cli").unwrap();
    assert_eq!(gemini.sync_status, SyncStatus::Synced);

    engine.toggle("fs", "gemini-cli", false).unwrap();
    let results = engine.sync_all();
    let gemini_result = results.iter().find(|r| r.app == "gemini-cli").unwrap();
    assert!(gemini_result.is_success());
    assert!(results.iter().find(|r| r.app == "cursor").unwrap().is_error());
}

#[test]
fn periodic_refresh_syncs_pending_and_flags_vanished_files() {
    let temp = TempDir::new().unwrap();
    write(&cursor_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    write(&gemini_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_all();

    engine.toggle("fs", "cursor", false).unwrap();
    std::fs::remove_file(gemini_path(&temp)).unwrap();

    let report = engine.periodic_refresh();
    assert_eq!(report.synced.len(), 1);
    assert!(report.synced[0].is_success());
    assert_eq!(read_json(&cursor_path(&temp))["mcpServers"]["fs"]["disabled"], true);

    let gemini = engine.application("gemini-cli").unwrap();
    assert_eq!(gemini.sync_status, SyncStatus::Error);
    assert!(!gemini.detected);

    // Error apps are left alone until resolved.
    let report = engine.periodic_refresh();
    assert_eq!(report.skipped, vec!["gemini-cli".to_string()]);
}

#[test]
fn periodic_refresh_picks_up_external_edits() {
    let temp = TempDir::new().unwrap();
    write(&cursor_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_all();

    std::fs::write(
        cursor_path(&temp),
        r#"{"mcpServers": {"fs": {"command": "npx"}, "git": {"command": "uvx"}}}"#,
    )
    .unwrap();
    engine.periodic_refresh();

    assert!(engine.server("git", "cursor").is_ok());
    assert_eq!(
        engine.application("cursor").unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[test]
fn undetected_app_with_no_servers_is_not_created() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.refresh_one("vscode").unwrap();

    assert!(engine.sync_one("vscode").is_success());
    assert!(!temp.path().join("config/Code/User/mcp.json").exists());
}

#[test]
fn sync_all_reports_app_whose_file_vanished() {
    let temp = TempDir::new().unwrap();
    write(&cursor_path(&temp), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#);
    let engine = engine(&temp);
    engine.refresh_all();

    std::fs::remove_file(cursor_path(&temp)).unwrap();
    let report = engine.periodic_refresh();
    let cursor = report.reread.iter().find(|a| a.name == "cursor").unwrap();
    assert_eq!(cursor.sync_status, SyncStatus::Error);
    assert!(!cursor.detected);

    let results = engine.sync_all();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].app, "cursor");
    assert!(results[0].is_error());
    assert!(!cursor_path(&temp).exists());
}
