//! mcpsync Core Library
//!
//! Keeps MCP server definitions consistent across the configuration files
//! of several AI clients and editors: discovers each application's file,
//! normalizes its schema, lets callers toggle servers per application or
//! everywhere, and writes changes back with conflict detection and backups.

pub mod adapter;
pub mod backup;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod sync;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Adapters
    pub use crate::adapter::{AdapterContext, AdapterRegistry, AppAdapter, AppSchema, ToggleField};

    // Configuration
    pub use crate::config::{ConfigFormat, Settings, SettingsStore};
    pub use crate::context::AppContext;

    // Engine
    pub use crate::backup::{BackupEntry, BackupManager};
    pub use crate::registry::{ConsolidatedServer, ServerRegistry, ServerView};
    pub use crate::scheduler::{RefreshScheduler, SchedulerHandle};
    pub use crate::service::{ExportBundle, ImportSummary, McpSyncService, Resolution};
    pub use crate::sync::{AppSyncResult, RefreshReport, SyncEngine, SyncOutcome};

    // Errors and types
    pub use crate::error::{SyncError, SyncResult, ValidationError};
    pub use crate::types::{Application, McpServer, SyncRecord, SyncStatus};
}
