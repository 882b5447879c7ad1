//! VS Code adapter.
//!
//! VS Code keeps user-level MCP servers in `Code/User/mcp.json` under the
//! platform config directory, keyed `servers` rather than `mcpServers`.
//! Remote servers use `type`/`url` and are kept as extra fields.

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct VsCodeAdapter;

impl VsCodeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for VsCodeAdapter {
    fn id(&self) -> &'static str {
        "vscode"
    }

    fn display_name(&self) -> &'static str {
        "VS Code"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Json,
            servers_path: &["servers"],
            toggle: ToggleField::Disabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.config_dir.join("Code").join("User").join("mcp.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_servers_key_and_keeps_inputs() {
        let tmp = TempDir::new().unwrap();
        let ctx = AdapterContext::rooted_at(tmp.path());
        let path = VsCodeAdapter.config_path(&ctx);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{
  "inputs": [{"id": "token", "type": "promptString"}],
  "servers": {
    "github": {"type": "http", "url": "https://api.example.test/mcp"},
    "fs": {"type": "stdio", "command": "npx", "args": ["-y", "server-filesystem"]}
  }
}"#,
        )
        .unwrap();

        let snapshot = VsCodeAdapter.read(&ctx).unwrap();
        let names: Vec<_> = snapshot.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["github", "fs"]);
        assert!(snapshot.servers[0].command.is_empty());
        assert_eq!(snapshot.servers[1].extra["type"], "stdio");

        VsCodeAdapter.write(&ctx, &snapshot.servers).unwrap();
        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["inputs"][0]["id"], "token");
        assert_eq!(doc["servers"]["github"]["url"], "https://api.example.test/mcp");
        assert!(doc["servers"]["github"].get("command").is_none());
    }
}
