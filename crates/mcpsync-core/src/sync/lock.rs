use std::sync::{Mutex, MutexGuard};

/// Poison-tolerant locking. A panic while holding engine state must not
/// wedge every later request.
///
/// The first caller to see the poison logs it and clears the flag, so the
/// engine and slot locks report a panic once rather than on every access.
pub(crate) trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    mutex_type = std::any::type_name::<T>(),
                    file = loc.file(),
                    line = loc.line(),
                    "lock poisoned by a panicking sync task, recovering"
                );
                self.clear_poison();
                poisoned.into_inner()
            }
        }
    }
}
