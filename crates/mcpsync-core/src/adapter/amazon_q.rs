//! Amazon Q Developer CLI adapter (`~/.aws/amazonq/mcp.json`).

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct AmazonQAdapter;

impl AmazonQAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for AmazonQAdapter {
    fn id(&self) -> &'static str {
        "amazon-q"
    }

    fn display_name(&self) -> &'static str {
        "Amazon Q"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Json,
            servers_path: &["mcpServers"],
            toggle: ToggleField::Disabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.home_dir.join(".aws").join("amazonq").join("mcp.json")
    }
}
