//! Cursor adapter (`~/.cursor/mcp.json`).

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct CursorAdapter;

impl CursorAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for CursorAdapter {
    fn id(&self) -> &'static str {
        "cursor"
    }

    fn display_name(&self) -> &'static str {
        "Cursor"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Json,
            servers_path: &["mcpServers"],
            toggle: ToggleField::Disabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.home_dir.join(".cursor").join("mcp.json")
    }
}
