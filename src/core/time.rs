//! Clock abstraction for lease and retention bookkeeping
//!
//! The in-memory exchange never calls `Instant::now()` directly; it asks a
//! [`TimeProvider`] so tests can move time forward past a visibility timeout
//! or a retention period without sleeping.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;
use std::time::{Instant, SystemTime};

/// Source of monotonic and wall-clock time
pub trait TimeProvider: Send + Sync {
    /// Monotonic time, used for lease and retention arithmetic
    fn now(&self) -> Instant;

    /// Wall-clock time, used for event timestamps
    fn system_time(&self) -> SystemTime;
}

/// Production clock backed by the operating system
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Clone)]
#[cfg(test)]
pub struct MockTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
    current_system_time: Arc<Mutex<SystemTime>>,
}

#[cfg(test)]
impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
            current_system_time: Arc::new(Mutex::new(SystemTime::now())),
        }
    }

    /// Move both clocks forward by `duration`
    pub fn advance_time(&self, duration: Duration) {
        *self.current_instant.lock().unwrap() += duration;
        *self.current_system_time.lock().unwrap() += duration;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Instant {
        *self.current_instant.lock().unwrap()
    }

    fn system_time(&self) -> SystemTime {
        *self.current_system_time.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_provider_is_monotonic() {
        let provider = SystemTimeProvider;

        let first = provider.now();
        std::thread::sleep(Duration::from_millis(1));
        let second = provider.now();

        assert!(second > first);
    }

    #[test]
    fn test_mock_time_provider_advances_both_clocks() {
        let provider = MockTimeProvider::new();

        let initial_instant = provider.now();
        let initial_system = provider.system_time();

        provider.advance_time(Duration::from_secs(30));

        assert_eq!(
            provider.now().duration_since(initial_instant),
            Duration::from_secs(30)
        );
        assert_eq!(
            provider
                .system_time()
                .duration_since(initial_system)
                .unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_mock_time_provider_clones_share_state() {
        let provider = MockTimeProvider::new();
        let shared = provider.clone();
        let before = shared.now();

        provider.advance_time(Duration::from_secs(5));

        assert_eq!(shared.now().duration_since(before), Duration::from_secs(5));
    }
}
