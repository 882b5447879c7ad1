//! Integration tests for reading and rewriting native config files.

use serde_json::{Value, json};
use tempfile::TempDir;

use mcpsync_core::adapter::{AdapterContext, AdapterRegistry, AppAdapter};
use mcpsync_core::error::SyncError;
use mcpsync_core::types::McpServer;

fn write(path: &std::path::Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[test]
fn every_json_adapter_round_trips_unknown_fields() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();

    for adapter in registry.all().iter().filter(|a| a.id() != "codex") {
        let key = adapter.schema().servers_path[0];
        let path = adapter.config_path(&ctx);
        let original = json!({
            "telemetry": {"enabled": false},
            key: {
                "fs": {
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
                    "env": {"DEBUG": "1"},
                    "timeout": 30000,
                    "alwaysAllow": ["read_file"]
                }
            },
            "zzz_trailing": [1, 2, 3]
        });
        write(&path, &serde_json::to_string_pretty(&original).unwrap());

        let snapshot = adapter.read(&ctx).unwrap();
        assert!(snapshot.content_hash.is_some(), "{}", adapter.id());
        adapter.write(&ctx, &snapshot.servers).unwrap();

        assert_eq!(read_json(&path), original, "{} lost data", adapter.id());
    }
}

#[test]
fn write_keeps_unrelated_keys_in_order() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("gemini-cli").unwrap();
    let path = adapter.config_path(&ctx);
    write(
        &path,
        r#"{"theme": "GitHub", "mcpServers": {"a": {"command": "x"}}, "selectedAuthType": "oauth"}"#,
    );

    let mut servers = adapter.read(&ctx).unwrap().servers;
    servers.push(McpServer::new("b", "y"));
    adapter.write(&ctx, &servers).unwrap();

    let doc = read_json(&path);
    let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["theme", "mcpServers", "selectedAuthType"]);
    let names: Vec<_> = doc["mcpServers"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn removed_servers_are_dropped_from_file() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("cursor").unwrap();
    let path = adapter.config_path(&ctx);
    write(&path, r#"{"mcpServers": {"a": {"command": "x"}, "b": {"command": "y"}}}"#);

    let servers: Vec<_> = adapter
        .read(&ctx)
        .unwrap()
        .servers
        .into_iter()
        .filter(|s| s.name != "a")
        .collect();
    adapter.write(&ctx, &servers).unwrap();

    assert_eq!(read_json(&path), json!({"mcpServers": {"b": {"command": "y"}}}));
}

#[test]
fn codex_round_trip_keeps_values() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("codex").unwrap();
    let path = adapter.config_path(&ctx);
    write(
        &path,
        r#"model = "o3"
approval_policy = "on-request"

[mcp_servers.docs]
command = "docs-mcp"
args = ["--port", "0"]
enabled = false
tool_timeout_sec = 60

[profiles.fast]
model = "o4-mini"
"#,
    );
    let before: toml::Table = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    let snapshot = adapter.read(&ctx).unwrap();
    assert!(!snapshot.servers[0].enabled);
    adapter.write(&ctx, &snapshot.servers).unwrap();

    let after: toml::Table = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn malformed_files_are_parse_errors() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("claude-code").unwrap();
    let path = adapter.config_path(&ctx);

    for body in [
        "{not json",
        r#"{"mcpServers": []}"#,
        r#"{"mcpServers": {"fs": "npx"}}"#,
        r#"{"mcpServers": {"fs": {"command": "npx", "args": "-y"}}}"#,
        r#"{"mcpServers": {"fs": {"command": "npx", "env": {"A": true}}}}"#,
    ] {
        write(&path, body);
        let err = adapter.read(&ctx).unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse { .. }), "{body}: {err}");
    }
}

#[test]
fn write_refuses_to_clobber_malformed_file() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("cursor").unwrap();
    let path = adapter.config_path(&ctx);
    write(&path, "{oops");

    assert!(adapter.write(&ctx, &[McpServer::new("fs", "npx")]).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{oops");
}

#[test]
fn path_override_takes_precedence() {
    let temp = TempDir::new().unwrap();
    let custom = temp.path().join("elsewhere/cursor.json");
    let mut overrides = std::collections::BTreeMap::new();
    overrides.insert("cursor".to_string(), custom.clone());
    let ctx = AdapterContext::rooted_at(temp.path()).with_overrides(overrides);
    let registry = AdapterRegistry::with_default_adapters();

    assert_eq!(registry.get("cursor").unwrap().config_path(&ctx), custom);
    assert_ne!(registry.get("codex").unwrap().config_path(&ctx), custom);
}

#[test]
fn detect_reports_presence() {
    let temp = TempDir::new().unwrap();
    let ctx = AdapterContext::rooted_at(temp.path());
    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get("amazon-q").unwrap();

    let app = adapter.detect(&ctx);
    assert!(!app.detected);
    assert_eq!(app.display_name, "Amazon Q");

    write(&adapter.config_path(&ctx), "{}");
    assert!(adapter.detect(&ctx).detected);
}
