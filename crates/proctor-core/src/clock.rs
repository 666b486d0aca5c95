// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Monitor Clock
// ─────────────────────────────────────────────────────────────────────
//! Time source for detection timestamps.
//!
//! Debounce windows are measured on this clock, so tests drive a
//! `ManualClock` instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds since an arbitrary fixed epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Unix epoch milliseconds, monotonic for the life of the clock.
///
/// The wall clock is read once at construction; later readings add
/// elapsed `Instant` time, so a wall-clock step backwards cannot
/// stretch a debounce window.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch_ms: u64,
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }
}

/// Settable clock shared between a test and the monitor under test.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
