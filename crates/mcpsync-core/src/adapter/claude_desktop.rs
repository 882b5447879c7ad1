//! Claude Desktop adapter.
//!
//! `claude_desktop_config.json` lives in the platform application-support
//! directory and holds servers under `mcpServers`.

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct ClaudeDesktopAdapter;

impl ClaudeDesktopAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for ClaudeDesktopAdapter {
    fn id(&self) -> &'static str {
        "claude-desktop"
    }

    fn display_name(&self) -> &'static str {
        "Claude Desktop"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Json,
            servers_path: &["mcpServers"],
            toggle: ToggleField::Disabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.app_support_dir
            .join("Claude")
            .join("claude_desktop_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_is_under_app_support() {
        let tmp = TempDir::new().unwrap();
        let ctx = AdapterContext::rooted_at(tmp.path());
        assert_eq!(
            ClaudeDesktopAdapter.config_path(&ctx),
            tmp.path()
                .join("app-support/Claude/claude_desktop_config.json")
        );
    }

    #[test]
    fn preserves_global_shortcut_and_disabled_flag() {
        let tmp = TempDir::new().unwrap();
        let ctx = AdapterContext::rooted_at(tmp.path());
        let path = ClaudeDesktopAdapter.config_path(&ctx);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"globalShortcut": "Ctrl+Space", "mcpServers": {"fs": {"command": "npx", "disabled": true}}}"#,
        )
        .unwrap();

        let snapshot = ClaudeDesktopAdapter.read(&ctx).unwrap();
        assert!(!snapshot.servers[0].enabled);

        let mut servers = snapshot.servers;
        servers[0].enabled = true;
        ClaudeDesktopAdapter.write(&ctx, &servers).unwrap();

        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["globalShortcut"], "Ctrl+Space");
        assert_eq!(doc["mcpServers"]["fs"]["disabled"], false);
    }
}
