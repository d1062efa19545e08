//! Clock port
//!
//! Entry identity is a millisecond timestamp, so every place that stamps
//! `created`, `updated` or `deleted_at` reads time through [`IClock`].

use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::Timestamp;

/// Millisecond wall clock
pub trait IClock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> Timestamp;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
///
/// Used by tests to produce same-instant writes.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Moves the clock to `now`
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl IClock for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
