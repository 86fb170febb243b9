//! Injected time sources.
//!
//! # Responsibility
//! - Provide wall-clock timestamps for `createdAt`/`updatedAt`.
//! - Provide a monotonic reading for elapsed-time tracking.
//!
//! # Invariants
//! - `monotonic()` never decreases for one clock instance.
//! - Core code never calls `Utc::now()` or `Instant::now()` directly.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source shared by the store and its timers.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;
    /// Time elapsed since an arbitrary, fixed origin.
    fn monotonic(&self) -> Duration;
}

/// Shared clock handle type used across core services.
pub type SharedClock = Arc<dyn Clock>;

/// Production clock backed by the system time and `Instant`.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Convenience constructor returning a shared handle.
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for deterministic tests and simulated waits.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// pass another to the store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_ms: Arc<AtomicI64>,
    elapsed_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Starts at `start` wall time with zero monotonic elapsed time.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
            elapsed_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Moves both wall and monotonic time forward.
    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.epoch_ms.fetch_add(millis, Ordering::SeqCst);
        self.elapsed_ms.fetch_add(millis, Ordering::SeqCst);
    }

    /// Moves only wall time, leaving monotonic time untouched.
    ///
    /// Negative offsets simulate a wall clock stepping backwards.
    pub fn shift_wall_clock(&self, offset_ms: i64) {
        self.epoch_ms.fetch_add(offset_ms, Ordering::SeqCst);
    }

    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::starting_at(start)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.epoch_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn monotonic(&self) -> Duration {
        let millis = self.elapsed_ms.load(Ordering::SeqCst).max(0);
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use std::time::Duration;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let handle = clock.shared();
        let before = handle.now();

        clock.advance(Duration::from_secs(5));

        assert_eq!(handle.monotonic(), Duration::from_secs(5));
        assert_eq!((handle.now() - before).num_seconds(), 5);
    }

    #[test]
    fn wall_clock_shift_keeps_monotonic_reading() {
        let clock = ManualClock::default();
        clock.advance(Duration::from_secs(2));
        clock.shift_wall_clock(-60_000);
        assert_eq!(clock.monotonic(), Duration::from_secs(2));
    }
}
