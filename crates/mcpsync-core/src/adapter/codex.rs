//! Codex adapter.
//!
//! Codex uses TOML (`~/.codex/config.toml`) with one `[mcp_servers.<name>]`
//! table per server and `enabled = false` to switch a server off.

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct CodexAdapter;

impl CodexAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for CodexAdapter {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Toml,
            servers_path: &["mcp_servers"],
            toggle: ToggleField::Enabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.home_dir.join(".codex").join("config.toml")
    }
}
