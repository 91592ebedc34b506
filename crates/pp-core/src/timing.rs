//! Tick duration accounting.
//!
//! The tick runner records how long each tick took against its budget. The
//! counters are atomics so a status reader on another thread can sample them
//! without stopping the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Accumulating timer for fixed-rate loops.
#[derive(Debug)]
pub struct TickTimer {
    total_ns: AtomicU64,
    max_ns: AtomicU64,
    count: AtomicU64,
    overruns: AtomicU64,
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    /// Record one tick. Returns `true` when `elapsed` exceeded `budget`.
    pub fn record(&self, elapsed: Duration, budget: Duration) -> bool {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let overran = elapsed > budget;
        if overran {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        overran
    }

    /// Number of recorded ticks.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Number of ticks that took longer than their budget.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    pub fn max_seconds(&self) -> f64 {
        self.max_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Average time per tick (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}
