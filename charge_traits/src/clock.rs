use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Wall-clock abstraction for deadline evaluation across the stack.
///
/// - now(): returns the current absolute time in UTC
///
/// Target times are absolute, so unlike a control-loop timer this has to be a
/// wall clock rather than a monotonic `Instant`.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Default, real-time clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time is set and advanced by hand.
///
/// Clones share the same instant, so a test can keep one handle and hand
/// another to the scheduler.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// A panic while holding the lock cannot leave a torn instant behind.
    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the clock by the given delta. Saturates at the maximum instant.
    pub fn advance(&self, d: TimeDelta) {
        let mut now = self.lock();
        *now = now.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Set the absolute time.
    pub fn set(&self, t: DateTime<Utc>) {
        *self.lock() = t;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
