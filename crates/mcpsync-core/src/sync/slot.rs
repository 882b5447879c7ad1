//! Per-application write serialization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::lock::MutexExt;

/// Serializes file operations for one application and tracks queued write
/// requests so only the newest one performs the write.
#[derive(Debug, Default)]
pub struct AppSlot {
    lock: Mutex<()>,
    tickets: AtomicU64,
}

impl AppSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket for a write request. Call before [`AppSlot::lock`].
    pub fn issue(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Newest ticket issued so far.
    pub fn latest(&self) -> u64 {
        self.tickets.load(Ordering::SeqCst)
    }

    /// Whether `ticket` is still the newest request.
    pub fn is_latest(&self, ticket: u64) -> bool {
        self.latest() == ticket
    }

    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock_or_recover()
    }
}
