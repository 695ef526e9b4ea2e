use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction used for reading timestamps and motion timers.
///
/// - now_ms(): milliseconds since the clock's own epoch
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `mark`, saturating at 0 on underflow.
    fn ms_since(&self, mark: u64) -> u64 {
        self.now_ms().saturating_sub(mark)
    }
}

/// Real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        let ms = self.epoch.elapsed().as_millis();
        ms.min(u128::from(u64::MAX)) as u64
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// Used for replaying recorded cycles and in tests; `sleep(d)` advances
/// the clock by `d` without blocking. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SteppedClock {
    now_ms: Arc<AtomicU64>,
}

impl SteppedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Set the absolute time in milliseconds.
    pub fn set_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }
}

impl Clock for SteppedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
