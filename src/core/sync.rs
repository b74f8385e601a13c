//! Lock poisoning helpers
//!
//! Shared state in the exchange and the notification bus lives behind std
//! locks. A poisoned lock means a panic happened mid-mutation, so instead of
//! unwrapping we turn it into the caller's own error type.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

/// Convert a poisoned `Mutex::lock()` result into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use queuehop::core::sync::handle_mutex_poison;
/// use queuehop::exchange::api::ExchangeError;
///
/// let slots = Mutex::new(Vec::<u64>::new());
/// let guard = handle_mutex_poison(slots.lock(), |message| ExchangeError::OperationFailed {
///     message,
/// })
/// .unwrap();
/// assert!(guard.is_empty());
/// ```
pub fn handle_mutex_poison<'a, T, E>(
    result: LockResult<MutexGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "mutex poisoned: a panic occurred while the lock was held ({poison_err})"
        ))
    })
}

/// Convert a poisoned `RwLock::read()` result into an application error
pub fn handle_rwlock_read<'a, T, E>(
    result: LockResult<RwLockReadGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "rwlock poisoned on read: a writer panicked while holding the lock ({poison_err})"
        ))
    })
}

/// Convert a poisoned `RwLock::write()` result into an application error
pub fn handle_rwlock_write<'a, T, E>(
    result: LockResult<RwLockWriteGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "rwlock poisoned on write: a panic occurred while the lock was held ({poison_err})"
        ))
    })
}
