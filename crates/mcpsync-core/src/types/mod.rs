//! Shared core types used across adapters, the registry and the coordinator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One MCP server as described by a single application's config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Native fields this engine does not interpret, carried verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl McpServer {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            enabled: true,
            extra: Map::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Per-application synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Never read.
    Unsynced,
    /// In-memory state matches the last known on-disk state.
    Synced,
    /// In-memory state differs from disk; no write attempted yet.
    Pending,
    /// The file changed on disk since it was read.
    Conflict,
    /// Reading or writing failed.
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unsynced => "unsynced",
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Error => "error",
        }
    }

    /// Conflict and error stick until the caller resolves them.
    pub fn needs_resolution(&self) -> bool {
        matches!(self, SyncStatus::Conflict | SyncStatus::Error)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consuming application and what the engine currently knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub display_name: String,
    pub config_path: PathBuf,
    pub detected: bool,
    pub server_count: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Application {
    pub fn new(name: &str, display_name: &str, config_path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            config_path,
            detected: false,
            server_count: 0,
            last_sync: None,
            sync_status: SyncStatus::Unsynced,
            last_error: None,
        }
    }
}

/// Hash of a config file captured at read time, used only for conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub app_name: String,
    /// `None` when the file did not exist at read time.
    pub content_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(app_name: &str, content_hash: Option<String>) -> Self {
        Self {
            app_name: app_name.to_string(),
            content_hash,
            timestamp: Utc::now(),
        }
    }
}
