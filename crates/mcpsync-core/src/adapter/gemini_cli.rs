//! Gemini CLI adapter (`~/.gemini/settings.json`).

use std::path::PathBuf;

use crate::config::ConfigFormat;

use super::{AdapterContext, AppAdapter, AppSchema, ToggleField};

#[derive(Debug, Default)]
pub struct GeminiCliAdapter;

impl GeminiCliAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AppAdapter for GeminiCliAdapter {
    fn id(&self) -> &'static str {
        "gemini-cli"
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn schema(&self) -> AppSchema {
        AppSchema {
            format: ConfigFormat::Json,
            servers_path: &["mcpServers"],
            toggle: ToggleField::Disabled,
        }
    }

    fn default_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.home_dir.join(".gemini").join("settings.json")
    }
}
