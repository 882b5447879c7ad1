//! Results reported by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Application;

/// How a persistence request for one application ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SyncOutcome {
    Success,
    /// The file changed on disk since it was read; nothing was written.
    Conflict,
    Error { message: String },
    /// A newer request for the same application was queued and wrote instead.
    Superseded,
    /// Recorded in memory only; automatic sync is off.
    Pending,
    /// The request matched the current state; the application was not touched.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSyncResult {
    pub app: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

impl AppSyncResult {
    pub fn success(app: &str) -> Self {
        Self::new(app, SyncOutcome::Success)
    }

    pub fn conflict(app: &str) -> Self {
        Self::new(app, SyncOutcome::Conflict)
    }

    pub fn error(app: &str, message: impl Into<String>) -> Self {
        Self::new(
            app,
            SyncOutcome::Error {
                message: message.into(),
            },
        )
    }

    pub fn superseded(app: &str) -> Self {
        Self::new(app, SyncOutcome::Superseded)
    }

    pub fn pending(app: &str) -> Self {
        Self::new(app, SyncOutcome::Pending)
    }

    pub fn unchanged(app: &str) -> Self {
        Self::new(app, SyncOutcome::Unchanged)
    }

    fn new(app: &str, outcome: SyncOutcome) -> Self {
        Self {
            app: app.to_string(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Success)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Conflict)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Error { .. })
    }
}

/// What one periodic refresh pass did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub at: DateTime<Utc>,
    /// Pending applications that were written.
    pub synced: Vec<AppSyncResult>,
    /// Applications re-read from disk, with their resulting state.
    pub reread: Vec<Application>,
    /// Applications left alone because they await conflict or error resolution.
    pub skipped: Vec<String>,
}

impl RefreshReport {
    pub fn is_quiet(&self) -> bool {
        self.synced.is_empty() && self.skipped.is_empty()
    }
}
